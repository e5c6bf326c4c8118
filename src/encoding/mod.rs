//! Byte-level coding primitives shared by every on-disk and in-memory format.
//!
//! All formats in this crate (block entries, block handles, the table footer,
//! write-batch records, memtable entries) are built from a handful of
//! primitives defined here.
//!
//! # Wire format
//!
//! | Primitive             | Encoding                                        |
//! |-----------------------|-------------------------------------------------|
//! | fixed32               | 4 bytes, little-endian                          |
//! | fixed64               | 8 bytes, little-endian                          |
//! | varint32 / varint64   | LEB128: 7 bits per byte, high bit = "more"      |
//! | length-prefixed slice | `[varint32 len][bytes]`                         |
//!
//! A varint32 occupies at most 5 bytes and a varint64 at most 10.
//!
//! # Zero-panic guarantee
//!
//! Decoders never index past the end of their input. Truncated or
//! overlong input is reported through [`EncodingError`], which converts
//! into [`Error::Corruption`](crate::Error::Corruption) at module
//! boundaries.
//!
//! # Structured types
//!
//! Fixed-layout records (block handles, the footer) implement [`Encode`]
//! and [`Decode`]; the convenience helpers [`encode_to_vec`] and
//! [`decode_from_slice`] wrap them.


use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Maximum encoded length of a varint32.
pub const MAX_VARINT32_LEN: usize = 5;

/// Maximum encoded length of a varint64.
pub const MAX_VARINT64_LEN: usize = 10;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors produced while decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The buffer ran out of bytes before decoding completed.
    #[error("unexpected end of buffer (need {needed} bytes, have {available})")]
    UnexpectedEof {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A varint did not terminate within its maximum width.
    #[error("varint exceeds {max_len} bytes")]
    VarintOverflow {
        /// Maximum encoded width for the integer type.
        max_len: usize,
    },

    /// A length field or structured value is out of range.
    #[error("length overflow: {0}")]
    LengthOverflow(String),

    /// Application-level decode error.
    #[error("{0}")]
    Custom(String),
}

// ------------------------------------------------------------------------------------------------
// Core traits
// ------------------------------------------------------------------------------------------------

/// Serialize `self` into a byte buffer.
///
/// Implementations must be deterministic: the same logical value always
/// yields the exact same bytes.
pub trait Encode {
    /// Append the encoded representation of `self` to `buf`.
    fn encode_to(&self, buf: &mut Vec<u8>);
}

/// Deserialize a value from a byte slice.
///
/// Returns `(value, bytes_consumed)` so that callers can advance through
/// a buffer containing several encoded items.
pub trait Decode: Sized {
    /// Decode one value starting at `buf[0]`.
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError>;
}

/// Encode a value into a freshly-allocated `Vec<u8>`.
pub fn encode_to_vec<T: Encode>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode_to(&mut buf);
    buf
}

/// Decode a value from the beginning of `buf`.
pub fn decode_from_slice<T: Decode>(buf: &[u8]) -> Result<(T, usize), EncodingError> {
    T::decode_from(buf)
}

// ------------------------------------------------------------------------------------------------
// Internal helpers
// ------------------------------------------------------------------------------------------------

/// Verify that `buf` has at least `needed` bytes.
#[inline]
fn require(buf: &[u8], needed: usize) -> Result<(), EncodingError> {
    if buf.len() < needed {
        Err(EncodingError::UnexpectedEof {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Fixed-width integers
// ------------------------------------------------------------------------------------------------

/// Append `value` as 4 little-endian bytes.
#[inline]
pub fn put_fixed32(dst: &mut Vec<u8>, value: u32) {
    dst.extend_from_slice(&value.to_le_bytes());
}

/// Append `value` as 8 little-endian bytes.
#[inline]
pub fn put_fixed64(dst: &mut Vec<u8>, value: u64) {
    dst.extend_from_slice(&value.to_le_bytes());
}

/// Decode a fixed32 from the first 4 bytes of `buf`.
#[inline]
pub fn decode_fixed32(buf: &[u8]) -> Result<u32, EncodingError> {
    require(buf, 4)?;
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Decode a fixed64 from the first 8 bytes of `buf`.
#[inline]
pub fn decode_fixed64(buf: &[u8]) -> Result<u64, EncodingError> {
    require(buf, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    Ok(u64::from_le_bytes(bytes))
}

// ------------------------------------------------------------------------------------------------
// Varints
// ------------------------------------------------------------------------------------------------

/// Append `value` as a varint32.
#[inline]
pub fn put_varint32(dst: &mut Vec<u8>, value: u32) {
    put_varint64(dst, u64::from(value));
}

/// Append `value` as a varint64.
pub fn put_varint64(dst: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        dst.push((value as u8) | 0x80);
        value >>= 7;
    }
    dst.push(value as u8);
}

/// Number of bytes `value` occupies when varint-encoded.
pub fn varint_length(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Decode a varint32 from the start of `buf`.
///
/// Returns `(value, bytes_consumed)`.
#[inline]
pub fn get_varint32(buf: &[u8]) -> Result<(u32, usize), EncodingError> {
    // Single-byte values dominate block entry headers.
    if let Some(&b) = buf.first() {
        if b < 0x80 {
            return Ok((u32::from(b), 1));
        }
    }
    let (value, n) = decode_varint(buf, MAX_VARINT32_LEN)?;
    u32::try_from(value)
        .map(|v| (v, n))
        .map_err(|_| EncodingError::VarintOverflow {
            max_len: MAX_VARINT32_LEN,
        })
}

/// Decode a varint64 from the start of `buf`.
///
/// Returns `(value, bytes_consumed)`.
#[inline]
pub fn get_varint64(buf: &[u8]) -> Result<(u64, usize), EncodingError> {
    decode_varint(buf, MAX_VARINT64_LEN)
}

fn decode_varint(buf: &[u8], max_len: usize) -> Result<(u64, usize), EncodingError> {
    let mut result = 0u64;
    for (i, &byte) in buf.iter().take(max_len).enumerate() {
        let shift = 7 * i as u32;
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }
    if buf.len() < max_len {
        Err(EncodingError::UnexpectedEof {
            needed: buf.len() + 1,
            available: buf.len(),
        })
    } else {
        Err(EncodingError::VarintOverflow { max_len })
    }
}

// ------------------------------------------------------------------------------------------------
// Length-prefixed slices
// ------------------------------------------------------------------------------------------------

/// Append `[varint32 len][bytes]`.
///
/// `value` must be shorter than 4 GiB.
pub fn put_length_prefixed_slice(dst: &mut Vec<u8>, value: &[u8]) {
    debug_assert!(u32::try_from(value.len()).is_ok());
    put_varint32(dst, value.len() as u32);
    dst.extend_from_slice(value);
}

/// Decode a length-prefixed slice from the start of `buf`.
///
/// Returns `(slice, bytes_consumed)` where the slice borrows from `buf`.
pub fn get_length_prefixed_slice(buf: &[u8]) -> Result<(&[u8], usize), EncodingError> {
    let (len, n) = get_varint32(buf)?;
    let len = len as usize;
    let rest = &buf[n..];
    require(rest, len)?;
    Ok((&rest[..len], n + len))
}
