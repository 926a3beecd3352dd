//! Source CSV readers for test results and practice statistics.
//!
//! Sources may be plain or gzip-compressed (`.gz`); compression is detected
//! from the file extension. Each reader is a streaming iterator that holds one
//! CSV record at a time.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::categories::ResultCategory;
use crate::constants::{MONTH_PREFIX_LEN, SUPPRESSED_COUNT, SUPPRESSED_COUNT_MARKERS};
use crate::error::{Result, StoreError};
use crate::types::Value;

type SourceRecords = csv::StringRecordsIntoIter<Box<dyn Read + Send>>;

/// One test-result row.
///
/// Field order defines the sort order sources are expected to follow:
/// test code, then practice, then month.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResultRow {
    pub test_code: String,
    pub practice_code: String,
    pub month: String,
    pub result_category: i32,
    pub count: i64,
}

/// One practice-statistic value.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticRow {
    pub name: String,
    pub practice_code: String,
    pub month: String,
    pub value: Value,
}

/// Open a source file, transparently decompressing `.gz` files.
pub fn open_source(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path).map_err(|e| StoreError::io(path, "open", e))?;
    let reader = BufReader::new(file);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Normalise a suppressed count marker or parse an integer count.
pub fn parse_count(value: &str) -> Option<i64> {
    if SUPPRESSED_COUNT_MARKERS.contains(&value) {
        return Some(SUPPRESSED_COUNT);
    }
    value.parse().ok()
}

/// Keep only the `YYYY-MM-DD` part of a month value.
pub fn normalise_month(value: &str) -> String {
    value
        .chars()
        .take(MONTH_PREFIX_LEN)
        .map(|c| if c == '/' { '-' } else { c })
        .collect()
}

fn csv_error(path: &Path, err: csv::Error) -> StoreError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(source) => StoreError::io(path, "read", source),
        other => StoreError::parse(path, line, format!("{:?}", other)),
    }
}

fn open_csv(path: &Path) -> Result<(csv::StringRecord, SourceRecords)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(open_source(path)?);
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    Ok((headers, reader.into_records()))
}

fn find_column(
    headers: &csv::StringRecord,
    path: &Path,
    names: &[&'static str],
) -> Result<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or(StoreError::MissingHeader {
            path: path.to_path_buf(),
            column: names[0],
        })
}

// ============================================================================
// Test results
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct TestResultColumns {
    test_code: usize,
    practice: usize,
    month: usize,
    result_category: usize,
    count: usize,
}

/// Streaming reader over one test-result source file.
///
/// Required columns: `test_code`, `practice_code` (or `source`), `month`,
/// `result_category`, `count`.
pub struct TestResultReader {
    path: PathBuf,
    records: SourceRecords,
    columns: TestResultColumns,
}

impl TestResultReader {
    pub fn open(path: &Path) -> Result<Self> {
        let (headers, records) = open_csv(path)?;
        let columns = TestResultColumns {
            test_code: find_column(&headers, path, &["test_code"])?,
            practice: find_column(&headers, path, &["practice_code", "source"])?,
            month: find_column(&headers, path, &["month"])?,
            result_category: find_column(&headers, path, &["result_category"])?,
            count: find_column(&headers, path, &["count"])?,
        };
        Ok(Self {
            path: path.to_path_buf(),
            records,
            columns,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_record(&self, record: &csv::StringRecord) -> Result<ResultRow> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let category_str = field(self.columns.result_category);
        let result_category: i32 = category_str.parse().map_err(|_| {
            StoreError::parse(
                &self.path,
                line,
                format!("invalid result_category '{}'", category_str),
            )
        })?;
        if ResultCategory::from_code(result_category).is_none() {
            return Err(StoreError::parse(
                &self.path,
                line,
                format!("unknown result_category {}", result_category),
            ));
        }

        let count_str = field(self.columns.count);
        let count = parse_count(count_str).ok_or_else(|| {
            StoreError::parse(&self.path, line, format!("invalid count '{}'", count_str))
        })?;

        Ok(ResultRow {
            test_code: field(self.columns.test_code).to_string(),
            practice_code: field(self.columns.practice).to_string(),
            month: normalise_month(field(self.columns.month)),
            result_category,
            count,
        })
    }
}

impl Iterator for TestResultReader {
    type Item = Result<ResultRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(csv_error(&self.path, e))),
        };
        Some(self.parse_record(&record))
    }
}

// ============================================================================
// Practice statistics
// ============================================================================

const STAR_PU_COLUMN: &str = "star_pu";
const IGNORED_STATISTIC_COLUMNS: &[&str] = &["pct_id"];

/// Streaming reader over one practice-statistics source file.
///
/// Required columns: `month`, `practice`. An optional `star_pu` column holds
/// a JSON object whose entries become `star_pu.<name>` statistics. Every
/// other column (except `pct_id`) is a numeric statistic.
pub struct PracticeStatisticsReader {
    path: PathBuf,
    records: SourceRecords,
    month_col: usize,
    practice_col: usize,
    star_pu_col: Option<usize>,
    statistic_cols: Vec<(usize, String)>,
    pending: VecDeque<StatisticRow>,
}

impl PracticeStatisticsReader {
    pub fn open(path: &Path) -> Result<Self> {
        let (headers, records) = open_csv(path)?;
        let month_col = find_column(&headers, path, &["month"])?;
        let practice_col = find_column(&headers, path, &["practice"])?;
        let star_pu_col = headers.iter().position(|h| h == STAR_PU_COLUMN);
        let statistic_cols = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| {
                *i != month_col
                    && *i != practice_col
                    && Some(*i) != star_pu_col
                    && !IGNORED_STATISTIC_COLUMNS.contains(h)
            })
            .map(|(i, h)| (i, h.to_string()))
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            records,
            month_col,
            practice_col,
            star_pu_col,
            statistic_cols,
            pending: VecDeque::new(),
        })
    }

    /// Names of the plain statistic columns, in header order.
    pub fn statistic_names(&self) -> impl Iterator<Item = &str> {
        self.statistic_cols.iter().map(|(_, name)| name.as_str())
    }

    fn expand_record(&mut self, record: &csv::StringRecord) -> Result<()> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let month = normalise_month(record.get(self.month_col).unwrap_or(""));
        let practice = record.get(self.practice_col).unwrap_or("").to_string();

        for (idx, name) in &self.statistic_cols {
            let raw = record.get(*idx).unwrap_or("");
            let value = parse_statistic_value(raw).ok_or_else(|| {
                StoreError::parse(
                    &self.path,
                    line,
                    format!("invalid value '{}' for statistic '{}'", raw, name),
                )
            })?;
            self.pending.push_back(StatisticRow {
                name: name.clone(),
                practice_code: practice.clone(),
                month: month.clone(),
                value,
            });
        }

        if let Some(col) = self.star_pu_col {
            let raw = record.get(col).unwrap_or("");
            let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
                .map_err(|e| {
                    StoreError::parse(&self.path, line, format!("invalid star_pu JSON: {}", e))
                })?;
            for (name, json) in parsed {
                let value = json_number(&json).ok_or_else(|| {
                    StoreError::parse(
                        &self.path,
                        line,
                        format!("non-numeric star_pu value for '{}'", name),
                    )
                })?;
                self.pending.push_back(StatisticRow {
                    name: format!("{}.{}", STAR_PU_COLUMN, name),
                    practice_code: practice.clone(),
                    month: month.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Values containing a decimal point are floats, everything else integers.
fn parse_statistic_value(raw: &str) -> Option<Value> {
    if raw.contains('.') {
        raw.parse::<f64>().ok().map(Value::Float)
    } else {
        raw.parse::<i64>().ok().map(Value::Int)
    }
}

fn json_number(value: &serde_json::Value) -> Option<Value> {
    match value.as_i64() {
        Some(i) => Some(Value::Int(i)),
        None => value.as_f64().map(Value::Float),
    }
}

impl Iterator for PracticeStatisticsReader {
    type Item = Result<StatisticRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            let record = match self.records.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(csv_error(&self.path, e))),
            };
            if let Err(e) = self.expand_record(&record) {
                return Some(Err(e));
            }
        }
    }
}
