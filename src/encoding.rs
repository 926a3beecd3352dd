//! Varint utilities for the matrix blob format.
//!
//! This module provides:
//! - LEB128 varint encoding/decoding for compact storage
//! - Zigzag mapping so small negative integers also encode in few bytes
//! - A bounds-checked cursor for decoding untrusted payloads

use crate::constants::MAX_VARINT_BYTES;

/// Error type for varint decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarIntError {
    /// Buffer ended before varint was complete (continuation bit was set on last byte).
    /// Contains the number of bytes that were available.
    Truncated(usize),
    /// Varint exceeds maximum size (>10 bytes for u64).
    /// Contains the number of bytes consumed before overflow.
    Overflow(usize),
}

impl std::fmt::Display for VarIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarIntError::Truncated(bytes) => {
                write!(f, "truncated varint after {} bytes", bytes)
            }
            VarIntError::Overflow(bytes) => {
                write!(f, "malformed varint: exceeded 10 bytes at {} bytes consumed", bytes)
            }
        }
    }
}

impl std::error::Error for VarIntError {}

/// Append a u64 to `out` as a LEB128 varint.
///
/// Smaller values use fewer bytes (1 byte for 0-127, 2 bytes for 128-16383, etc.).
#[inline]
pub(crate) fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let mut i = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[i] = byte;
            out.extend_from_slice(&buf[..=i]);
            return;
        }
        buf[i] = byte | 0x80;
        i += 1;
    }
}

/// Decode a variable-length integer from the start of a byte slice.
///
/// # Returns
/// * `Ok((value, bytes_consumed))` - Successfully decoded varint
/// * `Err(VarIntError::Truncated(n))` - Buffer ended with continuation bit set after n bytes
/// * `Err(VarIntError::Overflow(n))` - Varint exceeded 10 bytes
#[inline]
pub(crate) fn decode_varint(buf: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    let mut i = 0;
    loop {
        if i >= buf.len() {
            return Err(VarIntError::Truncated(i));
        }
        let byte = buf[i];
        value |= ((byte & 0x7F) as u64) << shift;
        i += 1;
        if byte & 0x80 == 0 {
            return Ok((value, i));
        }
        shift += 7;
        if shift >= 64 {
            return Err(VarIntError::Overflow(i));
        }
    }
}

#[inline]
pub(crate) fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub(crate) fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Forward-only reader over a decoded payload.
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, VarIntError> {
        let byte = *self.buf.get(self.pos).ok_or(VarIntError::Truncated(0))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64, VarIntError> {
        let (value, consumed) = decode_varint(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub(crate) fn read_zigzag(&mut self) -> Result<i64, VarIntError> {
        self.read_varint().map(zigzag_decode)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, VarIntError> {
        let end = self.pos + 8;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or(VarIntError::Truncated(self.remaining()))?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        self.pos = end;
        Ok(f64::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        for val in [0u64, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX] {
            let mut buf = Vec::new();
            push_varint(&mut buf, val);
            let (decoded, consumed) = decode_varint(&buf).expect("decode failed");
            assert_eq!(decoded, val);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_varint_lengths() {
        let mut buf = Vec::new();
        push_varint(&mut buf, 127);
        assert_eq!(buf.len(), 1);
        buf.clear();
        push_varint(&mut buf, 128);
        assert_eq!(buf, vec![0x80, 0x01]);
        buf.clear();
        push_varint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), MAX_VARINT_BYTES);
    }

    #[test]
    fn test_varint_truncated() {
        assert_eq!(decode_varint(&[]), Err(VarIntError::Truncated(0)));
        assert_eq!(decode_varint(&[0x80, 0x80]), Err(VarIntError::Truncated(2)));
    }

    #[test]
    fn test_varint_overflow() {
        let buf = [0xFFu8; 11];
        assert!(matches!(decode_varint(&buf), Err(VarIntError::Overflow(_))));
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        for v in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn test_cursor_reads_in_sequence() {
        let mut buf = vec![7u8];
        push_varint(&mut buf, 300);
        push_varint(&mut buf, zigzag_encode(-5));
        buf.extend_from_slice(&1.25f64.to_le_bytes());

        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(cursor.read_u8().unwrap(), 7);
        assert_eq!(cursor.read_varint().unwrap(), 300);
        assert_eq!(cursor.read_zigzag().unwrap(), -5);
        assert_eq!(cursor.read_f64().unwrap(), 1.25);
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.read_u8().is_err());
    }
}
