//! Grouping of a globally sorted row stream into per-test-code runs.

use crate::error::{Result, StoreError};
use crate::source::ResultRow;

/// All rows for one test code, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    pub test_code: String,
    pub rows: Vec<ResultRow>,
}

/// Groups contiguous rows sharing a test code.
///
/// Only one group is held in memory at a time. Test codes must arrive in
/// strictly ascending run order; a code that goes backwards or reappears after
/// its run closed means the sources were not sorted, which is reported as an
/// error rather than silently splitting an entity across two matrices.
pub struct GroupByTestCode<I>
where
    I: Iterator<Item = Result<ResultRow>>,
{
    inner: I,
    lookahead: Option<ResultRow>,
    last_code: Option<String>,
    done: bool,
}

impl<I> GroupByTestCode<I>
where
    I: Iterator<Item = Result<ResultRow>>,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            lookahead: None,
            last_code: None,
            done: false,
        }
    }

    fn fail(&mut self, err: StoreError) -> Option<Result<TestGroup>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<I> Iterator for GroupByTestCode<I>
where
    I: Iterator<Item = Result<ResultRow>>,
{
    type Item = Result<TestGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let first = match self.lookahead.take() {
            Some(row) => row,
            None => match self.inner.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => return self.fail(e),
                None => {
                    self.done = true;
                    return None;
                }
            },
        };

        if let Some(last) = &self.last_code {
            if first.test_code.as_str() <= last.as_str() {
                let msg = format!(
                    "input is not sorted by test code: '{}' follows '{}'",
                    first.test_code, last
                );
                return self.fail(StoreError::validation(msg));
            }
        }

        let test_code = first.test_code.clone();
        let mut rows = vec![first];
        loop {
            match self.inner.next() {
                Some(Ok(row)) if row.test_code == test_code => rows.push(row),
                Some(Ok(row)) => {
                    self.lookahead = Some(row);
                    break;
                }
                Some(Err(e)) => return self.fail(e),
                None => break,
            }
        }

        self.last_code = Some(test_code.clone());
        Some(Ok(TestGroup { test_code, rows }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(test_code: &str, practice: &str) -> ResultRow {
        ResultRow {
            test_code: test_code.to_string(),
            practice_code: practice.to_string(),
            month: "2019-01-01".to_string(),
            result_category: 0,
            count: 1,
        }
    }

    fn groups(rows: Vec<ResultRow>) -> Result<Vec<TestGroup>> {
        GroupByTestCode::new(rows.into_iter().map(Ok)).collect()
    }

    #[test]
    fn test_groups_contiguous_runs() {
        let result = groups(vec![
            row("ALT", "P1"),
            row("ALT", "P2"),
            row("FBC", "P1"),
            row("TSH", "P1"),
            row("TSH", "P3"),
        ])
        .unwrap();
        let summary: Vec<(&str, usize)> = result
            .iter()
            .map(|g| (g.test_code.as_str(), g.rows.len()))
            .collect();
        assert_eq!(summary, vec![("ALT", 2), ("FBC", 1), ("TSH", 2)]);
    }

    #[test]
    fn test_empty_stream() {
        assert!(groups(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_reappearing_test_code_is_rejected() {
        let result = groups(vec![row("ALT", "P1"), row("FBC", "P1"), row("ALT", "P2")]);
        match result {
            Err(StoreError::Validation(msg)) => assert!(msg.contains("not sorted")),
            other => panic!("expected validation error, got {:?}", other.map(|g| g.len())),
        }
    }

    #[test]
    fn test_source_error_is_propagated() {
        let items: Vec<Result<ResultRow>> = vec![
            Ok(row("ALT", "P1")),
            Err(StoreError::validation("bad row")),
        ];
        let mut grouper = GroupByTestCode::new(items.into_iter());
        assert!(grouper.next().unwrap().is_err());
        assert!(grouper.next().is_none());
    }
}
