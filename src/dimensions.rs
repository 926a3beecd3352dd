//! Practice and date dimensions.
//!
//! Each distinct practice code and each month in the import window gets a
//! dense zero-based offset, assigned in lexical order so a store's layout
//! depends only on the set of values, never on the order they were seen.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Dimension, Result, StoreError};
use crate::source::{PracticeStatisticsReader, TestResultReader};
use crate::types::Shape;

/// Sorted, de-duplicated values with their offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionIndex {
    values: Vec<String>,
    offsets: HashMap<String, usize>,
}

impl DimensionIndex {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        let values: Vec<String> = sorted.into_iter().collect();
        let offsets = values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        Self { values, offsets }
    }

    pub fn offset(&self, value: &str) -> Option<usize> {
        self.offsets.get(value).copied()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.offsets.contains_key(value)
    }

    /// Values in offset order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Both matrix dimensions: practices are rows, dates are columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    pub practices: DimensionIndex,
    pub dates: DimensionIndex,
}

impl Dimensions {
    pub fn new(practices: DimensionIndex, dates: DimensionIndex) -> Self {
        Self { practices, dates }
    }

    /// Shape shared by every matrix in the store.
    pub fn shape(&self) -> Shape {
        Shape::new(self.practices.len(), self.dates.len())
    }

    /// Resolve a (practice, date) pair to (row, col), recording any unknown value.
    pub fn resolve(
        &self,
        practice: &str,
        date: &str,
        unknown: &mut UnknownTracker,
    ) -> Option<(usize, usize)> {
        let Some(row) = self.practices.offset(practice) else {
            unknown.record(Dimension::Practice, practice);
            return None;
        };
        let Some(col) = self.dates.offset(date) else {
            unknown.record(Dimension::Date, date);
            return None;
        };
        Some((row, col))
    }
}

/// How the practice dimension is populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PracticeSelection {
    /// Every practice with at least one in-window row in any source.
    #[default]
    ObservedInWindow,
    /// An externally supplied list, used as-is.
    Listed(Vec<String>),
}

impl PracticeSelection {
    /// Resolve to the practice dimension, scanning sources if required.
    pub fn resolve(
        &self,
        test_sources: &[PathBuf],
        statistic_sources: &[PathBuf],
        dates: &DimensionIndex,
    ) -> Result<DimensionIndex> {
        match self {
            PracticeSelection::ObservedInWindow => {
                let observed = scan_practices(test_sources, statistic_sources, dates)?;
                Ok(DimensionIndex::from_values(observed))
            }
            PracticeSelection::Listed(codes) => {
                Ok(DimensionIndex::from_values(codes.iter().cloned()))
            }
        }
    }
}

/// Collect practice codes having at least one row dated inside `dates`.
pub fn scan_practices(
    test_sources: &[PathBuf],
    statistic_sources: &[PathBuf],
    dates: &DimensionIndex,
) -> Result<BTreeSet<String>> {
    let mut practices = BTreeSet::new();
    for path in test_sources {
        let before = practices.len();
        for row in TestResultReader::open(path)? {
            let row = row?;
            if dates.contains(&row.month) && !practices.contains(&row.practice_code) {
                practices.insert(row.practice_code);
            }
        }
        info!(
            "Scanned {}: {} new practices in window",
            path.display(),
            practices.len() - before
        );
    }
    for path in statistic_sources {
        for row in PracticeStatisticsReader::open(path)? {
            let row = row?;
            if dates.contains(&row.month) && !practices.contains(&row.practice_code) {
                practices.insert(row.practice_code);
            }
        }
    }
    Ok(practices)
}

/// Read a list of codes, one per line. Blank lines and `#` comments are skipped.
pub fn read_code_list(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| StoreError::io(path, "open code list", e))?;
    let mut codes = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| StoreError::io(path, "read code list", e))?;
        let code = line.trim();
        if code.is_empty() || code.starts_with('#') {
            continue;
        }
        codes.push(code.to_string());
    }
    Ok(codes)
}

/// Remembers unknown dimension values so each is logged once per build.
#[derive(Debug, Default)]
pub struct UnknownTracker {
    practices: HashSet<String>,
    dates: HashSet<String>,
    skipped_rows: u64,
}

impl UnknownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a skipped row; log the value if it has not been seen before.
    pub fn record(&mut self, dimension: Dimension, value: &str) {
        self.skipped_rows += 1;
        let seen = match dimension {
            Dimension::Practice => &mut self.practices,
            Dimension::Date => &mut self.dates,
        };
        if !seen.contains(value) {
            seen.insert(value.to_string());
            match dimension {
                Dimension::Practice => info!("Skipping unknown practice: {}", value),
                Dimension::Date => info!("Skipping out-of-range date: {}", value),
            }
        }
    }

    pub fn unknown_practices(&self) -> usize {
        self.practices.len()
    }

    pub fn unknown_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }
}
