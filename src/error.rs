//! Unified error type for the pathstore library.
//!
//! Library code returns `StoreError`; the CLI wraps it in `anyhow::Result`
//! and adds context at the command boundary.
//!
//! # Error Categories
//!
//! - **Io**: File system operations (open, read, rename)
//! - **AlreadyExists**: A build was asked to overwrite an existing store
//! - **MissingHeader** / **Parse**: Malformed source CSV files
//! - **Sqlite**: Failures reported by the embedded database
//! - **Corrupt**: A stored matrix blob could not be decoded
//! - **UnknownDimension** / **UnknownEntity** / **UnknownStatistic**: Query-time caller errors
//! - **Validation**: Invalid parameters or violated input invariants

use std::fmt;
use std::path::PathBuf;

use crate::types::EntityKey;

/// Which of the two matrix dimensions a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Practice,
    Date,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Practice => write!(f, "practice"),
            Dimension::Date => write!(f, "date"),
        }
    }
}

/// Unified error type for the pathstore library.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
    },

    /// The build target already exists; stores are never overwritten.
    AlreadyExists(PathBuf),

    /// A required column is absent from a source file's header.
    MissingHeader { path: PathBuf, column: &'static str },

    /// A source row could not be parsed.
    Parse {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    /// Error reported by SQLite.
    Sqlite {
        context: String,
        source: rusqlite::Error,
    },

    /// A serialized matrix could not be decoded.
    Corrupt(String),

    /// A practice code or date that has no offset in this store.
    UnknownDimension { dimension: Dimension, value: String },

    /// No entity row exists for this key.
    UnknownEntity(EntityKey),

    /// No statistic matrix is stored under this name.
    UnknownStatistic(String),

    /// Validation error (invalid parameters, data invariants).
    Validation(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "I/O error during {} on '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            StoreError::AlreadyExists(path) => {
                write!(f, "File already exists at: {}", path.display())
            }
            StoreError::MissingHeader { path, column } => {
                write!(
                    f,
                    "Missing required column '{}' in header of '{}'",
                    column,
                    path.display()
                )
            }
            StoreError::Parse { path, line, detail } => {
                write!(f, "Parse error in '{}' line {}: {}", path.display(), line, detail)
            }
            StoreError::Sqlite { context, source } => {
                write!(f, "SQLite error ({}): {}", context, source)
            }
            StoreError::Corrupt(detail) => write!(f, "Corrupt matrix data: {}", detail),
            StoreError::UnknownDimension { dimension, value } => {
                write!(f, "Unknown {} value: '{}'", dimension, value)
            }
            StoreError::UnknownEntity(key) => write!(f, "No entity stored for {}", key),
            StoreError::UnknownStatistic(name) => write!(f, "No statistic named '{}'", name),
            StoreError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Sqlite { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============================================================================
// Conversion traits
// ============================================================================

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            path: PathBuf::new(),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite {
            context: "sqlite operation".to_string(),
            source: err,
        }
    }
}

/// Convenience type alias for Results using StoreError.
pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Helper constructors
// ============================================================================

impl StoreError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Create a parse error for a source file line.
    pub fn parse(path: impl Into<PathBuf>, line: u64, detail: impl Into<String>) -> Self {
        StoreError::Parse {
            path: path.into(),
            line,
            detail: detail.into(),
        }
    }

    /// Create an SQLite error with context.
    pub fn sqlite(context: impl Into<String>, source: rusqlite::Error) -> Self {
        StoreError::Sqlite {
            context: context.into(),
            source,
        }
    }

    /// Create a corrupt-blob error.
    pub fn corrupt(detail: impl Into<String>) -> Self {
        StoreError::Corrupt(detail.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    /// Create an unknown-dimension error.
    pub fn unknown_dimension(dimension: Dimension, value: impl Into<String>) -> Self {
        StoreError::UnknownDimension {
            dimension,
            value: value.into(),
        }
    }
}

/// Extension for attaching context to SQLite results.
pub(crate) trait SqliteContext<T> {
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqliteContext<T> for std::result::Result<T, rusqlite::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| StoreError::sqlite(context, e))
    }
}

// ============================================================================
// Tests
// ============================================================================
