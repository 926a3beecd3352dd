//! Matrix blob serialization.
//!
//! # Format (version 1)
//!
//! ```text
//! Header (uncompressed, 8 bytes):
//!   magic "PSMX" (4 bytes)
//!   version u32 LE
//! Payload (zstd stream, level 3):
//!   kind   u8   0 = integer, 1 = float
//!   layout u8   0 = dense, 1 = sparse
//!   rows   varint
//!   cols   varint
//!   dense:  rows * cols values, column-major
//!   sparse: per column: nnz varint, then nnz x (row delta varint, value)
//! Values: integers zigzag varint, floats f64 LE bits.
//! ```
//!
//! The first row delta of each column is relative to -1, so every delta is at
//! least 1. Identical matrices always produce identical bytes.

use crate::constants::{MATRIX_FORMAT_VERSION, MATRIX_MAGIC, MATRIX_ZSTD_LEVEL, MAX_MATRIX_CELLS};
use crate::encoding::{push_varint, zigzag_encode, ByteCursor, VarIntError};
use crate::error::{Result, StoreError};
use crate::matrix::{Cell, Csc, Grid, Matrix, Storage};
use crate::types::Shape;

const KIND_INTEGER: u8 = 0;
const KIND_FLOAT: u8 = 1;
const LAYOUT_DENSE: u8 = 0;
const LAYOUT_SPARSE: u8 = 1;
const HEADER_LEN: usize = 8;

/// Cell types that know their on-disk value encoding.
trait BlobCell: Cell {
    fn write(self, out: &mut Vec<u8>);
    fn read(cursor: &mut ByteCursor<'_>) -> std::result::Result<Self, VarIntError>;
}

impl BlobCell for i64 {
    fn write(self, out: &mut Vec<u8>) {
        push_varint(out, zigzag_encode(self));
    }

    fn read(cursor: &mut ByteCursor<'_>) -> std::result::Result<Self, VarIntError> {
        cursor.read_zigzag()
    }
}

impl BlobCell for f64 {
    fn write(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bits().to_le_bytes());
    }

    fn read(cursor: &mut ByteCursor<'_>) -> std::result::Result<Self, VarIntError> {
        cursor.read_f64()
    }
}

/// Serialize a finalized matrix into a self-describing compressed blob.
pub fn serialize(matrix: &Matrix) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    match matrix {
        Matrix::Integer(grid) => encode_grid(&mut payload, KIND_INTEGER, grid),
        Matrix::Float(grid) => encode_grid(&mut payload, KIND_FLOAT, grid),
    }

    let compressed = zstd::stream::encode_all(payload.as_slice(), MATRIX_ZSTD_LEVEL)
        .map_err(|e| StoreError::validation(format!("zstd compression failed: {}", e)))?;

    let mut blob = Vec::with_capacity(HEADER_LEN + compressed.len());
    blob.extend_from_slice(MATRIX_MAGIC);
    blob.extend_from_slice(&MATRIX_FORMAT_VERSION.to_le_bytes());
    blob.extend_from_slice(&compressed);
    Ok(blob)
}

fn encode_grid<T: BlobCell>(out: &mut Vec<u8>, kind: u8, grid: &Grid<T>) {
    let shape = grid.shape();
    out.push(kind);
    match grid.storage() {
        Storage::Dense(data) => {
            out.push(LAYOUT_DENSE);
            push_varint(out, shape.rows as u64);
            push_varint(out, shape.cols as u64);
            for &value in data {
                value.write(out);
            }
        }
        Storage::Sparse(csc) => {
            out.push(LAYOUT_SPARSE);
            push_varint(out, shape.rows as u64);
            push_varint(out, shape.cols as u64);
            for c in 0..shape.cols {
                let (start, end) = (csc.col_ptr[c], csc.col_ptr[c + 1]);
                push_varint(out, (end - start) as u64);
                let mut prev: i64 = -1;
                for i in start..end {
                    let row = csc.row_idx[i] as i64;
                    push_varint(out, (row - prev) as u64);
                    prev = row;
                    csc.values[i].write(out);
                }
            }
        }
    }
}

/// Decode a blob produced by [`serialize`].
///
/// Any structural problem is reported as [`StoreError::Corrupt`].
pub fn deserialize(blob: &[u8]) -> Result<Matrix> {
    if blob.len() < HEADER_LEN {
        return Err(StoreError::corrupt(format!(
            "blob too short: {} bytes",
            blob.len()
        )));
    }
    if &blob[0..4] != MATRIX_MAGIC {
        return Err(StoreError::corrupt("invalid matrix magic bytes"));
    }
    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&blob[4..8]);
    let version = u32::from_le_bytes(version_bytes);
    if version != MATRIX_FORMAT_VERSION {
        return Err(StoreError::corrupt(format!(
            "unsupported matrix format version {} (expected {})",
            version, MATRIX_FORMAT_VERSION
        )));
    }

    let payload = zstd::stream::decode_all(&blob[HEADER_LEN..])
        .map_err(|e| StoreError::corrupt(format!("zstd decompression failed: {}", e)))?;

    let mut cursor = ByteCursor::new(&payload);
    let kind = cursor.read_u8().map_err(truncated)?;
    let matrix = match kind {
        KIND_INTEGER => Matrix::Integer(decode_grid(&mut cursor)?),
        KIND_FLOAT => Matrix::Float(decode_grid(&mut cursor)?),
        other => return Err(StoreError::corrupt(format!("unknown value kind {}", other))),
    };

    if cursor.remaining() != 0 {
        return Err(StoreError::corrupt(format!(
            "{} trailing bytes after matrix body",
            cursor.remaining()
        )));
    }
    Ok(matrix)
}

fn truncated(e: VarIntError) -> StoreError {
    StoreError::corrupt(e.to_string())
}

fn decode_grid<T: BlobCell>(cursor: &mut ByteCursor<'_>) -> Result<Grid<T>> {
    let layout = cursor.read_u8().map_err(truncated)?;
    let rows = cursor.read_varint().map_err(truncated)? as usize;
    let cols = cursor.read_varint().map_err(truncated)? as usize;
    let cells = rows
        .checked_mul(cols)
        .filter(|&c| c <= MAX_MATRIX_CELLS)
        .ok_or_else(|| StoreError::corrupt(format!("implausible shape {}x{}", rows, cols)))?;
    let shape = Shape::new(rows, cols);

    match layout {
        LAYOUT_DENSE => {
            // Every value takes at least one byte
            if cells > cursor.remaining() {
                return Err(StoreError::corrupt("dense body shorter than its shape"));
            }
            let mut data = Vec::with_capacity(cells);
            for _ in 0..cells {
                data.push(T::read(cursor).map_err(truncated)?);
            }
            Grid::dense(shape, data)
        }
        LAYOUT_SPARSE => {
            // Every column takes at least one byte for its entry count
            if cols > cursor.remaining() {
                return Err(StoreError::corrupt("sparse body shorter than its column count"));
            }
            let mut col_ptr = Vec::with_capacity(cols + 1);
            let mut row_idx = Vec::new();
            let mut values = Vec::new();
            col_ptr.push(0);
            for c in 0..cols {
                let nnz = cursor.read_varint().map_err(truncated)? as usize;
                if nnz > rows {
                    return Err(StoreError::corrupt(format!(
                        "column {} claims {} entries for {} rows",
                        c, nnz, rows
                    )));
                }
                let mut prev: i64 = -1;
                for _ in 0..nnz {
                    let delta = cursor.read_varint().map_err(truncated)?;
                    let row = prev
                        .checked_add(delta as i64)
                        .filter(|&r| delta > 0 && r < rows as i64)
                        .ok_or_else(|| {
                            StoreError::corrupt(format!("row index out of range in column {}", c))
                        })?;
                    row_idx.push(row as u32);
                    values.push(T::read(cursor).map_err(truncated)?);
                    prev = row;
                }
                col_ptr.push(values.len());
            }
            Grid::sparse(
                shape,
                Csc {
                    col_ptr,
                    row_idx,
                    values,
                },
            )
        }
        other => Err(StoreError::corrupt(format!("unknown layout {}", other))),
    }
}
