//! Build command handlers.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use pathstore::config::load_build_config;
use pathstore::dimensions::read_code_list;
use pathstore::{build, BuildConfig, EmptyEntityPolicy, ImportJob, PracticeSelection};

/// Options of the `build` subcommand.
pub struct BuildArgs {
    pub output: PathBuf,
    pub end_date: String,
    pub months: Option<u32>,
    pub sources: Vec<PathBuf>,
    pub statistics: Vec<PathBuf>,
    pub practice_list: Option<PathBuf>,
    pub test_code_list: Option<PathBuf>,
    pub retain_empty: bool,
}

impl BuildArgs {
    fn into_config(self) -> Result<BuildConfig> {
        let practices = match &self.practice_list {
            Some(path) => PracticeSelection::Listed(
                read_code_list(path)
                    .with_context(|| format!("Failed to read practice list: {}", path.display()))?,
            ),
            None => PracticeSelection::ObservedInWindow,
        };
        let test_codes = match &self.test_code_list {
            Some(path) => read_code_list(path)
                .with_context(|| format!("Failed to read test code list: {}", path.display()))?,
            None => Vec::new(),
        };
        let policy = if self.retain_empty {
            EmptyEntityPolicy::Retain
        } else {
            EmptyEntityPolicy::Prune
        };

        let mut config = BuildConfig::new(self.output, self.end_date)
            .with_practices(practices)
            .with_empty_entities(policy);
        config.months = self.months;
        if !self.sources.is_empty() || !test_codes.is_empty() {
            config = config.with_job(ImportJob::TestResults {
                sources: self.sources,
                test_codes,
            });
        }
        if !self.statistics.is_empty() {
            config = config.with_job(ImportJob::PracticeStatistics {
                sources: self.statistics,
            });
        }
        Ok(config)
    }
}

pub fn build_store(args: BuildArgs) -> Result<()> {
    run_build(&args.into_config()?)
}

pub fn build_store_from_config(config_path: &Path) -> Result<()> {
    log::info!("Building store from config: {}", config_path.display());
    let config = load_build_config(config_path)?;
    log::info!("Validation successful.");
    run_build(&config)
}

fn run_build(config: &BuildConfig) -> Result<()> {
    for job in &config.jobs {
        let count = job.sources().len();
        log::info!(
            "  - {}: {} file{}",
            job.name(),
            count,
            if count == 1 { "" } else { "s" }
        );
    }
    let summary = build(config)
        .with_context(|| format!("Failed to build store at {}", config.output.display()))?;
    println!("{}", summary);
    Ok(())
}
