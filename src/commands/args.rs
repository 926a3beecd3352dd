//! Command-line argument definitions for the pathstore CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pathstore")]
#[command(about = "Build and query compressed matrix stores of pathology test results")]
#[command(
    long_about = "pathstore: compiles pre-sorted pathology test-result extracts into a single SQLite file holding one compressed (practices x months) matrix per test code and result category.

WORKFLOW:
  1. Build a store:      pathstore build -o store.sqlite -e 2019-02 -s lab_a.csv -s lab_b.csv
  2. Query a cell:       pathstore fetch store.sqlite -t ALT -c 0 -p A81001 -d 2019-01-01
  3. Summarise a store:  pathstore inspect store.sqlite

INPUT FORMATS:
  Test results: CSV with columns test_code, practice_code (or source), month,
  result_category, count. Each file must be sorted by test code, practice and
  month. Counts of \"1-5\" or \"1-6\" are stored as 3.
  Practice statistics: CSV with columns month, practice, an optional star_pu
  JSON column, and one numeric column per statistic.
  Gzip-compressed files (.gz) are automatically detected and decompressed.

OUTPUT:
  The store is written to a hidden temp file beside the output and renamed
  into place only when complete. An existing output is never overwritten."
)]
#[command(after_help = "EXAMPLES:
  # Build five years of data ending February 2019
  pathstore build -o store.sqlite -e 2019-02 -s lab_a.csv.gz -s lab_b.csv.gz

  # Fixed practice list, keep empty entities, include list sizes
  pathstore build -o store.sqlite -e 2019-02 -s lab.csv --practice-list practices.txt \\
      --retain-empty --statistics practice_stats.csv

  # Build from a TOML config
  pathstore build-from-config build.toml

  # Fetch an under-range count (category -1)
  pathstore fetch store.sqlite -t ALT -c -1 -p A81001 -d 2019-01-01")]
pub struct Cli {
    /// Enable verbose progress output with timestamps
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a new store from sorted source files
    #[command(after_help = "EXAMPLES:
  # Default 60-month window
  pathstore build -o store.sqlite -e 2019-02 -s lab.csv

  # 15-month window, canonical test codes pre-created
  pathstore build -o store.sqlite -e 2019-02 -m 15 -s lab.csv --test-code-list tests.txt")]
    Build {
        /// Output store path (must not exist)
        #[arg(short, long)]
        output: PathBuf,

        /// Last month of the window, YYYY-MM
        #[arg(short, long)]
        end_date: String,

        /// Number of months in the window (default 60)
        #[arg(short, long)]
        months: Option<u32>,

        /// Test-result source files (CSV, optionally gzipped).
        /// Can specify multiple times: -s a.csv -s b.csv
        #[arg(short, long = "source", required_unless_present = "statistics")]
        sources: Vec<PathBuf>,

        /// Practice-statistics source files
        #[arg(long)]
        statistics: Vec<PathBuf>,

        /// File of practice codes, one per line, used instead of scanning the sources
        #[arg(long)]
        practice_list: Option<PathBuf>,

        /// File of canonical test codes whose entities are always created
        #[arg(long)]
        test_code_list: Option<PathBuf>,

        /// Keep entities without data (they read as zero) instead of pruning them
        #[arg(long)]
        retain_empty: bool,
    },

    /// Build a new store from a TOML config file
    #[command(after_help = "CONFIG FORMAT:
  [build]
  output = \"store.sqlite\"
  end_date = \"2019-02\"
  months = 60                      # optional
  empty_entities = \"prune\"         # or \"retain\"
  practice_list = \"practices.txt\"  # optional
  test_code_list = \"tests.txt\"     # optional

  [sources]
  test_results = [\"lab_a.csv\", \"lab_b.csv.gz\"]
  practice_statistics = [\"practice_stats.csv\"]

Relative paths are resolved against the config file's directory.")]
    BuildFromConfig {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Fetch one value from a store
    Fetch {
        /// Store file
        store: PathBuf,

        /// Test code
        #[arg(short, long, required_unless_present = "statistic")]
        test_code: Option<String>,

        /// Result category code (-1 to 8)
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        category: i32,

        /// Practice code
        #[arg(short, long)]
        practice: String,

        /// Month, YYYY-MM-DD
        #[arg(short, long)]
        date: String,

        /// Fetch a practice statistic instead of a test result
        #[arg(long, conflicts_with = "test_code")]
        statistic: Option<String>,
    },

    /// Summarise the contents of a store
    Inspect {
        /// Store file
        store: PathBuf,

        /// Show nonzero cell counts per result category for one test code
        #[arg(short, long)]
        test_code: Option<String>,

        /// Print every table row (blobs as hex)
        #[arg(long)]
        dump: bool,
    },
}
