//! Summing matrix rows by group, e.g. practices into the organisations they
//! belong to.

use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

use crate::error::{Result, StoreError};
use crate::matrix::{Cell, Grid, Matrix, SparseMatrix};
use crate::types::{Shape, Value};

/// Groups matrix rows and sums them column-wise.
///
/// A row may belong to several groups or to none. Group ids are sorted, and a
/// group's position in that order is its row in the output.
///
/// # Examples
/// ```
/// use pathstore::{RowGrouper, Shape, SparseMatrix, ValueKind, Value};
///
/// let mut m = SparseMatrix::new(Shape::new(4, 1));
/// for row in 0..4 {
///     m.set(row, 0, (row + 1) as i64).unwrap();
/// }
/// let matrix = m.finalize(ValueKind::Integer).unwrap();
///
/// let grouper = RowGrouper::new([(0, "even"), (1, "odd"), (2, "even"), (3, "odd")]);
/// let summed = grouper.sum(&matrix).unwrap();
/// assert_eq!(summed.get(0, 0), Value::Int(4));
/// assert_eq!(summed.get(1, 0), Value::Int(6));
/// ```
#[derive(Debug, Clone)]
pub struct RowGrouper {
    ids: Vec<String>,
    offsets: HashMap<String, usize>,
    selectors: Vec<Vec<usize>>,
    // input row -> output rows
    row_groups: HashMap<usize, Vec<usize>>,
    single_row: bool,
}

impl RowGrouper {
    /// Build from (row offset, group id) assignments.
    pub fn new<I, S>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (row, id) in assignments {
            groups.entry(id.into()).or_default().push(row);
        }

        let ids: Vec<String> = groups.keys().cloned().collect();
        let offsets = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        let selectors: Vec<Vec<usize>> = groups.into_values().collect();

        let mut row_groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for (group, rows) in selectors.iter().enumerate() {
            for &row in rows {
                row_groups.entry(row).or_default().push(group);
            }
        }
        let single_row = !selectors.is_empty() && selectors.iter().all(|rows| rows.len() == 1);

        Self {
            ids,
            offsets,
            selectors,
            row_groups,
            single_row,
        }
    }

    /// Group ids in output row order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn offset(&self, id: &str) -> Option<usize> {
        self.offsets.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn check_rows(&self, shape: Shape) -> Result<()> {
        match self.row_groups.keys().find(|&&row| row >= shape.rows) {
            Some(row) => Err(StoreError::validation(format!(
                "group row {} is outside matrix of shape {}",
                row, shape
            ))),
            None => Ok(()),
        }
    }

    /// Sum rows by group, giving a (groups x columns) matrix of the same kind.
    pub fn sum(&self, matrix: &Matrix) -> Result<Matrix> {
        self.check_rows(matrix.shape())?;
        match matrix {
            Matrix::Integer(grid) => self.sum_grid(grid, matrix),
            Matrix::Float(grid) => self.sum_grid(grid, matrix),
        }
    }

    fn sum_grid<T>(&self, grid: &Grid<T>, matrix: &Matrix) -> Result<Matrix>
    where
        T: Cell + AddAssign + Into<Value>,
    {
        let cols = grid.shape().cols;
        let mut out = SparseMatrix::new(Shape::new(self.ids.len(), cols));

        if self.single_row {
            // Each output row is a copy of one input row
            for (row, col, value) in grid.iter_nonzero() {
                if let Some(groups) = self.row_groups.get(&row) {
                    for &group in groups {
                        out.set(group, col, value)?;
                    }
                }
            }
        } else {
            let mut sums: BTreeMap<(usize, usize), T> = BTreeMap::new();
            for (row, col, value) in grid.iter_nonzero() {
                if let Some(groups) = self.row_groups.get(&row) {
                    for &group in groups {
                        *sums.entry((group, col)).or_default() += value;
                    }
                }
            }
            for ((group, col), value) in sums {
                out.set(group, col, value)?;
            }
        }
        out.finalize(matrix.kind())
    }

    /// Column-wise sum of the rows in one group.
    pub fn sum_one_group(&self, matrix: &Matrix, id: &str) -> Result<Vec<Value>> {
        self.check_rows(matrix.shape())?;
        let group = self
            .offset(id)
            .ok_or_else(|| StoreError::validation(format!("unknown group '{}'", id)))?;
        let cols = matrix.shape().cols;
        let rows = &self.selectors[group];
        let sums = match matrix {
            Matrix::Integer(grid) => (0..cols)
                .map(|col| Value::Int(rows.iter().map(|&row| grid.get(row, col)).sum()))
                .collect(),
            Matrix::Float(grid) => (0..cols)
                .map(|col| Value::Float(rows.iter().map(|&row| grid.get(row, col)).sum()))
                .collect(),
        };
        Ok(sums)
    }
}
