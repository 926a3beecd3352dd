//! Sparse accumulation and finalized matrix storage.
//!
//! A [`SparseMatrix`] collects cell assignments for one entity while its rows
//! stream past. [`SparseMatrix::finalize`] turns it into a [`Matrix`], stored
//! dense (column-major) or compressed-sparse-column, whichever takes fewer
//! bytes. Both layouts answer `get` in O(1) / O(log nnz-per-column).

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::{Result, StoreError};
use crate::row_grouper::RowGrouper;
use crate::types::{Shape, Value, ValueKind};

/// Numeric cell type stored in a [`Grid`].
pub trait Cell: Copy + PartialEq + Default + Debug + Send + Sync {
    /// Bytes per value in memory, used to pick the smaller layout.
    const SIZE: usize;

    fn is_zero(&self) -> bool;
    fn to_value(self) -> Value;
}

impl Cell for i64 {
    const SIZE: usize = 8;

    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn to_value(self) -> Value {
        Value::Int(self)
    }
}

impl Cell for f64 {
    const SIZE: usize = 8;

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

// ============================================================================
// Sparse accumulation
// ============================================================================

/// In-progress matrix addressed by (practice offset, date offset).
///
/// Cells are assigned, not summed: a second assignment to the same cell
/// replaces the first and is reported back to the caller.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    shape: Shape,
    // Keyed (col, row) so iteration is already in column-major order
    cells: BTreeMap<(u32, u32), Value>,
}

impl SparseMatrix {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            cells: BTreeMap::new(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of assigned cells (including explicit zeros).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Assign a cell, returning the value it replaced, if any.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<Value>) -> Result<Option<Value>> {
        if !self.shape.contains(row, col) {
            return Err(StoreError::validation(format!(
                "cell ({}, {}) is outside matrix of shape {}",
                row, col, self.shape
            )));
        }
        Ok(self.cells.insert((col as u32, row as u32), value.into()))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Value> {
        self.cells.get(&(col as u32, row as u32)).copied()
    }

    /// Integer if every assigned value is an integer, float otherwise.
    pub fn natural_kind(&self) -> ValueKind {
        if self.cells.values().all(|v| matches!(v, Value::Int(_))) {
            ValueKind::Integer
        } else {
            ValueKind::Float
        }
    }

    /// Convert into the stored form. Explicit zeros are dropped.
    pub fn finalize(self, kind: ValueKind) -> Result<Matrix> {
        let shape = self.shape;
        match kind {
            ValueKind::Integer => {
                let mut entries = Vec::with_capacity(self.cells.len());
                for ((col, row), value) in self.cells {
                    match value {
                        Value::Int(v) => entries.push((col, row, v)),
                        Value::Float(v) => {
                            return Err(StoreError::validation(format!(
                                "non-integer value {} in integer matrix",
                                v
                            )))
                        }
                    }
                }
                Ok(Matrix::Integer(Grid::from_entries(shape, entries)))
            }
            ValueKind::Float => {
                let entries = self
                    .cells
                    .into_iter()
                    .map(|((col, row), value)| (col, row, value.as_f64()))
                    .collect();
                Ok(Matrix::Float(Grid::from_entries(shape, entries)))
            }
        }
    }
}

// ============================================================================
// Finalized storage
// ============================================================================

/// Compressed sparse column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Csc<T> {
    /// `col_ptr[c]..col_ptr[c + 1]` indexes the entries of column `c`.
    pub col_ptr: Vec<usize>,
    /// Row index of each entry, ascending within a column.
    pub row_idx: Vec<u32>,
    pub values: Vec<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Storage<T> {
    /// Column-major values, `rows * cols` long.
    Dense(Vec<T>),
    Sparse(Csc<T>),
}

/// A finalized matrix of one cell type.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    shape: Shape,
    storage: Storage<T>,
}

impl<T: Cell> Grid<T> {
    /// Build from nonzero-or-zero entries sorted by (col, row).
    fn from_entries(shape: Shape, entries: Vec<(u32, u32, T)>) -> Self {
        let entries: Vec<(u32, u32, T)> = entries.into_iter().filter(|e| !e.2.is_zero()).collect();
        let nnz = entries.len();
        let dense_bytes = shape.cells() * T::SIZE;
        let sparse_bytes = nnz * (T::SIZE + 4) + (shape.cols + 1) * 4;

        if dense_bytes < sparse_bytes {
            let mut data = vec![T::default(); shape.cells()];
            for (col, row, value) in entries {
                data[col as usize * shape.rows + row as usize] = value;
            }
            Grid {
                shape,
                storage: Storage::Dense(data),
            }
        } else {
            let mut col_ptr = vec![0usize; shape.cols + 1];
            let mut row_idx = Vec::with_capacity(nnz);
            let mut values = Vec::with_capacity(nnz);
            for (col, row, value) in entries {
                col_ptr[col as usize + 1] += 1;
                row_idx.push(row);
                values.push(value);
            }
            for c in 0..shape.cols {
                col_ptr[c + 1] += col_ptr[c];
            }
            Grid {
                shape,
                storage: Storage::Sparse(Csc {
                    col_ptr,
                    row_idx,
                    values,
                }),
            }
        }
    }

    /// An all-zero matrix.
    pub fn zeros(shape: Shape) -> Self {
        Self::from_entries(shape, Vec::new())
    }

    /// Wrap decoded dense data, checking its length.
    pub fn dense(shape: Shape, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.cells() {
            return Err(StoreError::corrupt(format!(
                "dense data has {} values for shape {}",
                data.len(),
                shape
            )));
        }
        Ok(Grid {
            shape,
            storage: Storage::Dense(data),
        })
    }

    /// Wrap decoded CSC data, checking its structure.
    pub fn sparse(shape: Shape, csc: Csc<T>) -> Result<Self> {
        if csc.col_ptr.len() != shape.cols + 1
            || csc.col_ptr.first() != Some(&0)
            || csc.col_ptr.last() != Some(&csc.values.len())
            || csc.row_idx.len() != csc.values.len()
        {
            return Err(StoreError::corrupt(format!(
                "inconsistent sparse structure for shape {}",
                shape
            )));
        }
        if csc.col_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(StoreError::corrupt("column pointers are not monotonic"));
        }
        for c in 0..shape.cols {
            let rows = &csc.row_idx[csc.col_ptr[c]..csc.col_ptr[c + 1]];
            if rows.windows(2).any(|w| w[0] >= w[1])
                || rows.last().is_some_and(|&r| r as usize >= shape.rows)
            {
                return Err(StoreError::corrupt(format!("invalid row indices in column {}", c)));
            }
        }
        Ok(Grid {
            shape,
            storage: Storage::Sparse(csc),
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.storage, Storage::Dense(_))
    }

    /// Value at (row, col). Panics if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(
            self.shape.contains(row, col),
            "cell ({}, {}) outside shape {}",
            row,
            col,
            self.shape
        );
        match &self.storage {
            Storage::Dense(data) => data[col * self.shape.rows + row],
            Storage::Sparse(csc) => {
                let (start, end) = (csc.col_ptr[col], csc.col_ptr[col + 1]);
                match csc.row_idx[start..end].binary_search(&(row as u32)) {
                    Ok(pos) => csc.values[start + pos],
                    Err(_) => T::default(),
                }
            }
        }
    }

    pub fn count_nonzero(&self) -> usize {
        match &self.storage {
            Storage::Dense(data) => data.iter().filter(|v| !v.is_zero()).count(),
            Storage::Sparse(csc) => csc.values.iter().filter(|v| !v.is_zero()).count(),
        }
    }

    /// Nonzero cells as (row, col, value), in column-major order.
    pub fn iter_nonzero(&self) -> Box<dyn Iterator<Item = (usize, usize, T)> + '_> {
        let rows = self.shape.rows;
        match &self.storage {
            Storage::Dense(data) => Box::new(
                data.iter()
                    .enumerate()
                    .filter(|(_, v)| !v.is_zero())
                    .map(move |(i, v)| (i % rows, i / rows, *v)),
            ),
            Storage::Sparse(csc) => Box::new((0..self.shape.cols).flat_map(move |c| {
                (csc.col_ptr[c]..csc.col_ptr[c + 1])
                    .map(move |i| (csc.row_idx[i] as usize, c, csc.values[i]))
            })),
        }
    }
}

/// A finalized matrix of shape (practices, dates).
#[derive(Debug, Clone, PartialEq)]
pub enum Matrix {
    Integer(Grid<i64>),
    Float(Grid<f64>),
}

impl Matrix {
    pub fn zeros(shape: Shape, kind: ValueKind) -> Self {
        match kind {
            ValueKind::Integer => Matrix::Integer(Grid::zeros(shape)),
            ValueKind::Float => Matrix::Float(Grid::zeros(shape)),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Matrix::Integer(g) => g.shape(),
            Matrix::Float(g) => g.shape(),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Matrix::Integer(_) => ValueKind::Integer,
            Matrix::Float(_) => ValueKind::Float,
        }
    }

    pub fn is_dense(&self) -> bool {
        match self {
            Matrix::Integer(g) => g.is_dense(),
            Matrix::Float(g) => g.is_dense(),
        }
    }

    /// Value at (row, col). Panics if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Value {
        match self {
            Matrix::Integer(g) => Value::Int(g.get(row, col)),
            Matrix::Float(g) => Value::Float(g.get(row, col)),
        }
    }

    pub fn count_nonzero(&self) -> usize {
        match self {
            Matrix::Integer(g) => g.count_nonzero(),
            Matrix::Float(g) => g.count_nonzero(),
        }
    }

    /// Sum rows into one row per group of `grouper`.
    pub fn sum_rows(&self, grouper: &RowGrouper) -> Result<Matrix> {
        grouper.sum(self)
    }
}
