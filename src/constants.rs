//! Constants used throughout the pathstore library for binary format
//! definitions, input normalisation and build defaults.
//!
//! Centralizing these constants ensures consistency across the codebase and makes
//! it easy to adjust values when needed.

// ============================================================================
// Build Defaults
// ============================================================================

/// Number of months included in a store when none is configured.
pub const DEFAULT_NUM_MONTHS: u32 = 60;

/// Representative value stored for suppressed small counts ("1-5", "1-6").
pub const SUPPRESSED_COUNT: i64 = 3;

/// Count strings that denote a suppressed small value.
pub(crate) const SUPPRESSED_COUNT_MARKERS: &[&str] = &["1-5", "1-6"];

/// Only this many leading characters of a month value are significant.
pub(crate) const MONTH_PREFIX_LEN: usize = 10;

// ============================================================================
// Matrix Blob Format
// ============================================================================

/// Magic bytes at the start of every serialized matrix.
pub(crate) const MATRIX_MAGIC: &[u8; 4] = b"PSMX";

/// Current version of the serialized matrix format.
pub(crate) const MATRIX_FORMAT_VERSION: u32 = 1;

/// zstd level used for matrix payloads. Fixed so output is reproducible.
pub(crate) const MATRIX_ZSTD_LEVEL: i32 = 3;

/// Maximum number of bytes needed to encode a u64 as LEB128 varint.
pub(crate) const MAX_VARINT_BYTES: usize = 10;

// ============================================================================
// Safety Limits for Decoding
// ============================================================================

/// Maximum matrix cells accepted when decoding (guards against corrupt headers).
pub(crate) const MAX_MATRIX_CELLS: usize = 1 << 32;

// ============================================================================
// Progress Logging
// ============================================================================

/// Decide whether to log progress for the n-th test code.
///
/// Logs the first ten, the hundredth, then every two hundredth.
pub(crate) fn should_log_progress(n: usize) -> bool {
    n <= 10 || n == 100 || n % 200 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_log_progress() {
        assert!(should_log_progress(1));
        assert!(should_log_progress(10));
        assert!(!should_log_progress(11));
        assert!(should_log_progress(100));
        assert!(!should_log_progress(150));
        assert!(should_log_progress(400));
    }
}
