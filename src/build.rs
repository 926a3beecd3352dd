//! Build orchestration: from validated configuration to a finished store.

use std::fmt;
use std::path::PathBuf;

use log::info;
use serde::Deserialize;

use crate::dates::generate_dates;
use crate::dimensions::{DimensionIndex, Dimensions, PracticeSelection, UnknownTracker};
use crate::error::{Result, StoreError};
use crate::import::{ImportJob, ImportStats};
use crate::store::StoreWriter;

/// What to do with entity rows that never received any data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyEntityPolicy {
    /// Delete them before the store is finished.
    #[default]
    Prune,
    /// Keep them with a NULL value; they read as all zeros.
    Retain,
}

/// Everything a build needs, passed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub output: PathBuf,
    /// Last month of the window, `YYYY-MM`.
    pub end_date: String,
    /// Window length; defaults to [`DEFAULT_NUM_MONTHS`](crate::DEFAULT_NUM_MONTHS).
    pub months: Option<u32>,
    pub practices: PracticeSelection,
    pub jobs: Vec<ImportJob>,
    pub empty_entities: EmptyEntityPolicy,
}

impl BuildConfig {
    pub fn new(output: impl Into<PathBuf>, end_date: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            end_date: end_date.into(),
            months: None,
            practices: PracticeSelection::default(),
            jobs: Vec::new(),
            empty_entities: EmptyEntityPolicy::default(),
        }
    }

    pub fn with_months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    pub fn with_practices(mut self, practices: PracticeSelection) -> Self {
        self.practices = practices;
        self
    }

    pub fn with_job(mut self, job: ImportJob) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn with_empty_entities(mut self, policy: EmptyEntityPolicy) -> Self {
        self.empty_entities = policy;
        self
    }

    fn sources_of(&self, want_test_results: bool) -> Vec<PathBuf> {
        self.jobs
            .iter()
            .filter(|job| matches!(job, ImportJob::TestResults { .. }) == want_test_results)
            .flat_map(|job| job.sources().iter().cloned())
            .collect()
    }

    pub fn test_result_sources(&self) -> Vec<PathBuf> {
        self.sources_of(true)
    }

    pub fn statistic_sources(&self) -> Vec<PathBuf> {
        self.sources_of(false)
    }

    /// Check everything that can be checked without touching the output.
    ///
    /// Returns the date window on success.
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.output.exists() {
            return Err(StoreError::AlreadyExists(self.output.clone()));
        }
        let dates = generate_dates(&self.end_date, self.months)?;
        // A later job of the same kind would replace the earlier one's matrices
        for (i, job) in self.jobs.iter().enumerate() {
            if self.jobs[..i].iter().any(|earlier| earlier.name() == job.name()) {
                return Err(StoreError::validation(format!(
                    "more than one {} job; list all their sources in a single job",
                    job.name()
                )));
            }
        }
        for job in &self.jobs {
            for source in job.sources() {
                if !source.is_file() {
                    return Err(StoreError::io(
                        source,
                        "open source",
                        std::io::Error::new(std::io::ErrorKind::NotFound, "source file not found"),
                    ));
                }
            }
        }
        Ok(dates)
    }
}

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub output: PathBuf,
    pub practices: usize,
    pub dates: usize,
    pub imports: ImportStats,
    pub entities_pruned: usize,
    pub unknown_practices: usize,
    pub unknown_dates: usize,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Store:               {}", self.output.display())?;
        writeln!(f, "Practices x dates:   {} x {}", self.practices, self.dates)?;
        writeln!(f, "Test codes:          {}", self.imports.test_codes)?;
        writeln!(f, "Entities written:    {}", self.imports.entities_written)?;
        writeln!(f, "Entities pruned:     {}", self.entities_pruned)?;
        writeln!(f, "Statistics written:  {}", self.imports.statistics_written)?;
        writeln!(
            f,
            "Rows read/skipped:   {}/{}",
            self.imports.rows_read, self.imports.rows_skipped
        )?;
        writeln!(
            f,
            "Unknown values:      {} practices, {} dates",
            self.unknown_practices, self.unknown_dates
        )?;
        write!(f, "Overwritten cells:   {}", self.imports.overwritten_cells)
    }
}

/// Build a store from `config`.
///
/// Fails without creating anything if the output exists or the configuration
/// is invalid. On any later failure the output path is left untouched and the
/// partial temp file stays beside it.
pub fn build(config: &BuildConfig) -> Result<BuildSummary> {
    let dates = DimensionIndex::from_values(config.validate()?);
    info!(
        "Date window: {} months ending {}",
        dates.len(),
        dates.values().last().map(String::as_str).unwrap_or("")
    );

    let practices = config.practices.resolve(
        &config.test_result_sources(),
        &config.statistic_sources(),
        &dates,
    )?;
    let dimensions = Dimensions::new(practices, dates);
    info!("Matrix shape: {}", dimensions.shape());

    let writer = StoreWriter::create(&config.output)?;
    writer.write_dimensions(&dimensions)?;

    let mut unknown = UnknownTracker::new();
    let mut imports = ImportStats::default();
    for job in &config.jobs {
        let stats = job.run(&writer, &dimensions, &mut unknown)?;
        imports.merge(&stats);
    }

    let entities_pruned = match config.empty_entities {
        EmptyEntityPolicy::Prune => {
            let pruned = writer.prune_empty_entities()?;
            info!("Pruned {} entities without data", pruned);
            pruned
        }
        EmptyEntityPolicy::Retain => 0,
    };

    let output = writer.finish()?;
    let summary = BuildSummary {
        output,
        practices: dimensions.practices.len(),
        dates: dimensions.dates.len(),
        imports,
        entities_pruned,
        unknown_practices: unknown.unknown_practices(),
        unknown_dates: unknown.unknown_dates(),
    };
    info!(
        "Build complete: {} entities, {} statistics",
        summary.imports.entities_written, summary.imports.statistics_written
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_rejects_zero_months() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("out.sqlite"), "2019-02").with_months(0);
        assert!(matches!(config.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("out.sqlite"), "2019-02").with_job(
            ImportJob::TestResults {
                sources: vec![dir.path().join("missing.csv")],
                test_codes: vec![],
            },
        );
        assert!(matches!(config.validate(), Err(StoreError::Io { .. })));
        assert!(!dir.path().join("out.sqlite").exists());
    }

    #[test]
    fn test_validate_rejects_bad_end_date() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("out.sqlite"), "Feb 2019");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_repeated_job_kind() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();
        let config = BuildConfig::new(dir.path().join("out.sqlite"), "2019-02")
            .with_job(ImportJob::TestResults {
                sources: vec![a],
                test_codes: vec![],
            })
            .with_job(ImportJob::TestResults {
                sources: vec![b],
                test_codes: vec![],
            });
        match config.validate() {
            Err(StoreError::Validation(msg)) => assert!(msg.contains("test results")),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_sources_split_by_job_kind() {
        let config = BuildConfig::new("out.sqlite", "2019-02")
            .with_job(ImportJob::TestResults {
                sources: vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")],
                test_codes: vec![],
            })
            .with_job(ImportJob::PracticeStatistics {
                sources: vec![PathBuf::from("stats.csv")],
            });
        assert_eq!(config.test_result_sources().len(), 2);
        assert_eq!(config.statistic_sources(), vec![PathBuf::from("stats.csv")]);
    }

    #[test]
    fn test_summary_display() {
        let summary = BuildSummary {
            output: PathBuf::from("store.sqlite"),
            practices: 4,
            dates: 3,
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.contains("store.sqlite"));
        assert!(text.contains("4 x 3"));
    }
}
