//! Block handles, the footer, and checksummed block I/O.

use tracing::warn;

use crate::encoding::{
    self, Decode, Encode, EncodingError, decode_fixed32, decode_fixed64, get_varint64,
    put_fixed64, put_varint64,
};
use crate::env::{RandomAccessFile, WritableFile};
use crate::error::{Error, Result};
use crate::options::{CompressionType, ReadOptions};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Magic number stored in the last 8 bytes of every table file.
pub const TABLE_MAGIC_NUMBER: u64 = 0xdb47_7524_8b80_fb57;

/// Maximum encoded length of a [`BlockHandle`] (two varint64s).
pub const MAX_BLOCK_HANDLE_ENCODED_LEN: usize = 2 * encoding::MAX_VARINT64_LEN;

/// Encoded length of a [`Footer`]: two padded handles plus the magic.
pub const FOOTER_ENCODED_LEN: usize = 2 * MAX_BLOCK_HANDLE_ENCODED_LEN + 8;

/// Bytes following each block: 1-byte compression type + 4-byte masked crc.
pub const BLOCK_TRAILER_SIZE: usize = 5;

const MASK_DELTA: u32 = 0xa282_ead8;

// ------------------------------------------------------------------------------------------------
// Checksums
// ------------------------------------------------------------------------------------------------

/// Masks a crc so that checksums of data that itself embeds crcs stay
/// well distributed.
pub fn mask_crc(crc: u32) -> u32 {
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Inverse of [`mask_crc`].
pub fn unmask_crc(masked: u32) -> u32 {
    masked.wrapping_sub(MASK_DELTA).rotate_left(15)
}

/// Unmasked crc32 over a block's contents followed by its type byte.
pub fn block_checksum(contents: &[u8], block_type: u8) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(contents);
    hasher.update(&[block_type]);
    hasher.finalize()
}

// ------------------------------------------------------------------------------------------------
// Block handle
// ------------------------------------------------------------------------------------------------

/// Location of a block within a table file. `size` excludes the trailer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHandle {
    /// Byte offset of the block's first byte.
    pub offset: u64,
    /// Length of the block contents.
    pub size: u64,
}

impl BlockHandle {
    /// Builds a handle.
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }
}

impl Encode for BlockHandle {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        put_varint64(buf, self.offset);
        put_varint64(buf, self.size);
    }
}

impl Decode for BlockHandle {
    fn decode_from(buf: &[u8]) -> std::result::Result<(Self, usize), EncodingError> {
        let (offset, a) = get_varint64(buf)?;
        let (size, b) = get_varint64(&buf[a..])?;
        Ok((Self { offset, size }, a + b))
    }
}

// ------------------------------------------------------------------------------------------------
// Footer
// ------------------------------------------------------------------------------------------------

/// Fixed-size trailer at the end of every table.
///
/// ```text
/// [metaindex handle][index handle][zero padding to 40 bytes][magic: fixed64]
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Footer {
    /// Handle of the metaindex block.
    pub metaindex_handle: BlockHandle,
    /// Handle of the index block.
    pub index_handle: BlockHandle,
}

impl Encode for Footer {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        self.metaindex_handle.encode_to(buf);
        self.index_handle.encode_to(buf);
        buf.resize(start + 2 * MAX_BLOCK_HANDLE_ENCODED_LEN, 0);
        put_fixed64(buf, TABLE_MAGIC_NUMBER);
        debug_assert_eq!(buf.len(), start + FOOTER_ENCODED_LEN);
    }
}

impl Decode for Footer {
    fn decode_from(buf: &[u8]) -> std::result::Result<(Self, usize), EncodingError> {
        if buf.len() < FOOTER_ENCODED_LEN {
            return Err(EncodingError::UnexpectedEof {
                needed: FOOTER_ENCODED_LEN,
                available: buf.len(),
            });
        }
        let magic = decode_fixed64(&buf[FOOTER_ENCODED_LEN - 8..])?;
        if magic != TABLE_MAGIC_NUMBER {
            return Err(EncodingError::Custom(
                "not an sstable (bad magic number)".to_string(),
            ));
        }
        let (metaindex_handle, n) = BlockHandle::decode_from(buf)?;
        let (index_handle, _) = BlockHandle::decode_from(&buf[n..])?;
        Ok((
            Self {
                metaindex_handle,
                index_handle,
            },
            FOOTER_ENCODED_LEN,
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// Block I/O
// ------------------------------------------------------------------------------------------------

/// Appends `contents` plus its trailer to `file` at `*offset`, advancing
/// the offset. Returns the handle of the written block.
pub fn write_raw_block<W: WritableFile + ?Sized>(
    file: &mut W,
    offset: &mut u64,
    contents: &[u8],
    block_type: CompressionType,
) -> Result<BlockHandle> {
    let handle = BlockHandle::new(*offset, contents.len() as u64);
    file.append(contents)?;

    let mut trailer = [0u8; BLOCK_TRAILER_SIZE];
    trailer[0] = block_type as u8;
    let crc = mask_crc(block_checksum(contents, block_type as u8));
    trailer[1..].copy_from_slice(&crc.to_le_bytes());
    file.append(&trailer)?;

    *offset += (contents.len() + BLOCK_TRAILER_SIZE) as u64;
    Ok(handle)
}

/// Reads the block identified by `handle`, verifying its checksum when
/// asked to, and returns the uncompressed contents.
pub fn read_block(
    file: &dyn RandomAccessFile,
    options: &ReadOptions,
    handle: &BlockHandle,
) -> Result<Vec<u8>> {
    let n = usize::try_from(handle.size)
        .ok()
        .and_then(|n| n.checked_add(BLOCK_TRAILER_SIZE))
        .ok_or_else(|| Error::corruption("block handle size out of range"))?;
    let mut contents = file.read(handle.offset, n)?;
    if contents.len() != n {
        return Err(Error::corruption("truncated block read"));
    }

    let n = n - BLOCK_TRAILER_SIZE;
    let block_type = contents[n];
    if options.verify_checksums {
        let expected = unmask_crc(decode_fixed32(&contents[n + 1..])?);
        let actual = block_checksum(&contents[..n], block_type);
        if expected != actual {
            warn!(
                offset = handle.offset,
                size = handle.size,
                expected,
                actual,
                "block checksum mismatch"
            );
            return Err(Error::corruption("block checksum mismatch"));
        }
    }

    match CompressionType::try_from(block_type)? {
        CompressionType::None => {
            contents.truncate(n);
            Ok(contents)
        }
        CompressionType::Snappy => snap::raw::Decoder::new()
            .decompress_vec(&contents[..n])
            .map_err(|e| {
                Error::corruption(format!(
                    "corrupted snappy compressed block contents: {e}"
                ))
            }),
    }
}
