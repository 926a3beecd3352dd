//! pathstore: compiles sorted pathology test-result extracts into a compact,
//! randomly queryable SQLite matrix store.
//!
//! Every (test code, result category) pair owns one compressed matrix of shape
//! (practices x months). Builds are deterministic: the same logical input
//! gives the same store regardless of how it is split across source files.
//!
//! # Building and querying
//! ```no_run
//! use pathstore::{build, BuildConfig, EntityKey, ImportJob, MatrixStore};
//!
//! let config = BuildConfig::new("store.sqlite", "2019-02")
//!     .with_months(12)
//!     .with_job(ImportJob::TestResults {
//!         sources: vec!["lab_a.csv".into(), "lab_b.csv.gz".into()],
//!         test_codes: vec![],
//!     });
//! let summary = build(&config)?;
//!
//! let store = MatrixStore::open(&summary.output)?;
//! let value = store.fetch(&EntityKey::new("ALT", 0), "A81001", "2019-01-01")?;
//! # Ok::<(), pathstore::StoreError>(())
//! ```

// Internal modules
mod constants;
mod encoding;

// Public modules
pub mod build;
pub mod categories;
pub mod config;
pub mod core;
pub mod dates;
pub mod dimensions;
pub mod error;
pub mod import;
pub mod logging;
pub mod matrix;
pub mod row_grouper;
pub mod serializer;
pub mod source;
pub mod store;
pub mod types;

pub use build::{build, BuildConfig, BuildSummary, EmptyEntityPolicy};
pub use categories::ResultCategory;
pub use constants::{DEFAULT_NUM_MONTHS, SUPPRESSED_COUNT};
pub use crate::core::{GroupByTestCode, KWayMerge, TestGroup};
pub use dates::generate_dates;
pub use dimensions::{DimensionIndex, Dimensions, PracticeSelection, UnknownTracker};
pub use error::{Dimension, Result, StoreError};
pub use import::{ImportJob, ImportStats};
pub use matrix::{Matrix, SparseMatrix};
pub use row_grouper::RowGrouper;
pub use serializer::{deserialize, serialize};
pub use source::{PracticeStatisticsReader, ResultRow, StatisticRow, TestResultReader};
pub use store::{MatrixStore, StoreWriter};
pub use types::{EntityKey, Shape, Value, ValueKind};
