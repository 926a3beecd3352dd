//! Import jobs that fill a store from source files.
//!
//! Test results are streamed: sources are k-way merged, grouped by test code,
//! and each group is turned into at most one matrix per result category before
//! the next group is read. Practice statistics are small and accumulated
//! whole.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::constants::should_log_progress;
use crate::core::{GroupByTestCode, KWayMerge, TestGroup};
use crate::dimensions::{Dimensions, UnknownTracker};
use crate::error::{Dimension, Result};
use crate::matrix::SparseMatrix;
use crate::serializer::serialize;
use crate::source::{PracticeStatisticsReader, TestResultReader};
use crate::store::StoreWriter;
use crate::types::{EntityKey, ValueKind};

/// One unit of import work, run in order against an open store.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportJob {
    /// Per-test result counts, one matrix per (test code, result category).
    TestResults {
        /// Source files, each sorted by test code, practice and month.
        sources: Vec<PathBuf>,
        /// Canonical test codes whose entity rows exist even without data.
        test_codes: Vec<String>,
    },
    /// Named per-practice statistics such as list sizes.
    PracticeStatistics { sources: Vec<PathBuf> },
}

impl ImportJob {
    pub fn name(&self) -> &'static str {
        match self {
            ImportJob::TestResults { .. } => "test results",
            ImportJob::PracticeStatistics { .. } => "practice statistics",
        }
    }

    pub fn sources(&self) -> &[PathBuf] {
        match self {
            ImportJob::TestResults { sources, .. } => sources,
            ImportJob::PracticeStatistics { sources } => sources,
        }
    }

    pub fn run(
        &self,
        writer: &StoreWriter,
        dimensions: &Dimensions,
        unknown: &mut UnknownTracker,
    ) -> Result<ImportStats> {
        info!("Importing {} from {} source(s)", self.name(), self.sources().len());
        match self {
            ImportJob::TestResults {
                sources,
                test_codes,
            } => import_test_results(writer, dimensions, sources, test_codes, unknown),
            ImportJob::PracticeStatistics { sources } => {
                import_practice_statistics(writer, dimensions, sources, unknown)
            }
        }
    }
}

/// Counters reported by an import job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub test_codes: usize,
    pub entities_written: usize,
    pub statistics_written: usize,
    /// Cells assigned more than once; the last value was kept.
    pub overwritten_cells: u64,
}

impl ImportStats {
    pub fn merge(&mut self, other: &ImportStats) {
        self.rows_read += other.rows_read;
        self.rows_skipped += other.rows_skipped;
        self.test_codes += other.test_codes;
        self.entities_written += other.entities_written;
        self.statistics_written += other.statistics_written;
        self.overwritten_cells += other.overwritten_cells;
    }
}

/// Matrices built from one test code's rows, keyed by result category code.
struct GroupMatrices {
    matrices: BTreeMap<i32, SparseMatrix>,
    overwrites: BTreeMap<i32, u64>,
    skipped: u64,
}

fn build_group_matrices(
    group: &TestGroup,
    dimensions: &Dimensions,
    unknown: &mut UnknownTracker,
) -> Result<GroupMatrices> {
    let shape = dimensions.shape();
    let mut matrices: BTreeMap<i32, SparseMatrix> = BTreeMap::new();
    let mut overwrites: BTreeMap<i32, u64> = BTreeMap::new();
    let mut skipped = 0;

    for row in &group.rows {
        let Some((r, c)) = dimensions.resolve(&row.practice_code, &row.month, unknown) else {
            skipped += 1;
            continue;
        };
        let matrix = matrices
            .entry(row.result_category)
            .or_insert_with(|| SparseMatrix::new(shape));
        if matrix.set(r, c, row.count)?.is_some() {
            *overwrites.entry(row.result_category).or_default() += 1;
        }
    }

    Ok(GroupMatrices {
        matrices,
        overwrites,
        skipped,
    })
}

/// Stream sorted test-result sources into per-category matrices.
pub fn import_test_results(
    writer: &StoreWriter,
    dimensions: &Dimensions,
    sources: &[PathBuf],
    test_codes: &[String],
    unknown: &mut UnknownTracker,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    if !test_codes.is_empty() {
        let created = writer.precreate_entities(test_codes)?;
        debug!("Pre-created {} entity rows for {} test codes", created, test_codes.len());
    }

    // Opening every reader up front surfaces header errors before any work
    let readers = sources
        .iter()
        .map(|path| TestResultReader::open(path))
        .collect::<Result<Vec<_>>>()?;
    let merged = KWayMerge::new(readers);

    for (n, group) in GroupByTestCode::new(merged).enumerate() {
        let group = group?;
        stats.test_codes += 1;
        stats.rows_read += group.rows.len() as u64;
        writer.precreate_entities([group.test_code.as_str()])?;

        let built = build_group_matrices(&group, dimensions, unknown)?;
        stats.rows_skipped += built.skipped;
        for (category, count) in &built.overwrites {
            warn!(
                "{} duplicate cell(s) for {}; last value kept",
                count,
                EntityKey::new(group.test_code.as_str(), *category)
            );
            stats.overwritten_cells += count;
        }

        let matrices: Vec<(i32, SparseMatrix)> = built.matrices.into_iter().collect();
        let blobs = matrices
            .into_par_iter()
            .map(|(category, matrix)| {
                let finalized = matrix.finalize(ValueKind::Integer)?;
                Ok((category, serialize(&finalized)?))
            })
            .collect::<Result<Vec<_>>>()?;
        for (category, blob) in &blobs {
            writer.write_entity_blob(&EntityKey::new(group.test_code.as_str(), *category), blob)?;
        }
        stats.entities_written += blobs.len();

        if should_log_progress(n + 1) {
            info!(
                "Imported test code {} ({} so far, {} categories with data)",
                group.test_code,
                n + 1,
                blobs.len()
            );
        }
    }

    info!(
        "Imported {} rows for {} test codes ({} rows skipped)",
        stats.rows_read, stats.test_codes, stats.rows_skipped
    );
    Ok(stats)
}

/// Load practice statistics into one matrix per statistic name.
///
/// Rows for practices without an offset are dropped silently; rows dated
/// outside the window are dropped and each such date logged once.
pub fn import_practice_statistics(
    writer: &StoreWriter,
    dimensions: &Dimensions,
    sources: &[PathBuf],
    unknown: &mut UnknownTracker,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let shape = dimensions.shape();
    let mut matrices: BTreeMap<String, SparseMatrix> = BTreeMap::new();

    for path in sources {
        let reader = PracticeStatisticsReader::open(path)?;
        for name in reader.statistic_names() {
            matrices
                .entry(name.to_string())
                .or_insert_with(|| SparseMatrix::new(shape));
        }
        for row in reader {
            let row = row?;
            stats.rows_read += 1;
            let Some(r) = dimensions.practices.offset(&row.practice_code) else {
                stats.rows_skipped += 1;
                continue;
            };
            let Some(c) = dimensions.dates.offset(&row.month) else {
                unknown.record(Dimension::Date, &row.month);
                stats.rows_skipped += 1;
                continue;
            };
            let matrix = matrices
                .entry(row.name)
                .or_insert_with(|| SparseMatrix::new(shape));
            if matrix.set(r, c, row.value)?.is_some() {
                stats.overwritten_cells += 1;
            }
        }
    }

    for (name, matrix) in matrices {
        let kind = matrix.natural_kind();
        writer.write_statistic(&name, &matrix.finalize(kind)?)?;
        stats.statistics_written += 1;
    }
    if stats.overwritten_cells > 0 {
        warn!(
            "{} duplicate practice statistic cell(s); last value kept",
            stats.overwritten_cells
        );
    }
    info!(
        "Imported {} statistics from {} values",
        stats.statistics_written, stats.rows_read
    );
    Ok(stats)
}
