//! Table reader.
//!
//! [`Table::open`] reads the footer, the index block and (when a filter
//! policy is configured) the filter block named in the metaindex. The index
//! stays in memory for the table's lifetime; data blocks are read on demand
//! and are not cached.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::comparator::bytewise_comparator;
use crate::encoding::Decode;
use crate::env::RandomAccessFile;
use crate::error::{Error, Result};
use crate::filter::FilterBlockReader;
use crate::iterator::{StorageIterator, TwoLevelIterator};
use crate::options::{Options, ReadOptions};

use super::block::Block;
use super::format::{BlockHandle, FOOTER_ENCODED_LEN, Footer, read_block};

/// An open, immutable table. Shared between readers via `Arc`.
pub struct Table {
    options: Options,
    file: Arc<dyn RandomAccessFile>,
    metaindex_handle: BlockHandle,
    index_block: Block,
    filter: Option<FilterBlockReader>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("metaindex_handle", &self.metaindex_handle)
            .field("index_size", &self.index_block.size())
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

impl Table {
    /// Opens the table stored in the first `size` bytes of `file`.
    ///
    /// `options` must carry the comparator the table was built with. The
    /// metaindex and filter blocks are always checksummed; a missing or
    /// damaged filter is tolerated (the table is read without it) unless
    /// `options.paranoid_checks` is set.
    pub fn open(options: Options, file: Arc<dyn RandomAccessFile>, size: u64) -> Result<Arc<Self>> {
        options.validate()?;
        if size < FOOTER_ENCODED_LEN as u64 {
            return Err(Error::corruption("file is too short to be an sstable"));
        }
        let footer_bytes = file.read(size - FOOTER_ENCODED_LEN as u64, FOOTER_ENCODED_LEN)?;
        let (footer, _) = Footer::decode_from(&footer_bytes)?;

        let verified = ReadOptions {
            verify_checksums: true,
        };
        let index_block = Block::new(read_block(file.as_ref(), &verified, &footer.index_handle)?)?;

        let filter = match Self::read_filter(&options, file.as_ref(), &footer) {
            Ok(filter) => filter,
            Err(e) if options.paranoid_checks => return Err(e),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable filter block");
                None
            }
        };

        debug!(
            size,
            index_size = index_block.size(),
            has_filter = filter.is_some(),
            "table opened"
        );
        Ok(Arc::new(Self {
            options,
            file,
            metaindex_handle: footer.metaindex_handle,
            index_block,
            filter,
        }))
    }

    fn read_filter(
        options: &Options,
        file: &dyn RandomAccessFile,
        footer: &Footer,
    ) -> Result<Option<FilterBlockReader>> {
        let Some(policy) = options.filter_policy.as_ref() else {
            return Ok(None);
        };
        let verified = ReadOptions {
            verify_checksums: true,
        };
        let meta = Block::new(read_block(file, &verified, &footer.metaindex_handle)?)?;

        let key = format!("filter.{}", policy.name());
        let mut iter = meta.iter(bytewise_comparator());
        iter.seek(key.as_bytes());
        if !iter.valid() || iter.key() != key.as_bytes() {
            iter.status()?;
            return Ok(None);
        }
        let (handle, _) = BlockHandle::decode_from(iter.value())?;
        let contents = read_block(file, &verified, &handle)?;
        Ok(Some(FilterBlockReader::new(Arc::clone(policy), contents)))
    }

    /// Opens the data block whose encoded handle is `index_value`.
    fn block_reader(
        &self,
        options: &ReadOptions,
        index_value: &[u8],
    ) -> Result<Box<dyn StorageIterator>> {
        let (handle, _) = BlockHandle::decode_from(index_value)?;
        let block = Block::new(read_block(self.file.as_ref(), options, &handle)?)?;
        Ok(Box::new(block.iter(self.options.comparator.clone())))
    }

    /// Iterator over every entry in the table.
    pub fn iter(self: &Arc<Self>, options: ReadOptions) -> TwoLevelIterator {
        let table = Arc::clone(self);
        TwoLevelIterator::new(
            Box::new(self.index_block.iter(self.options.comparator.clone())),
            Box::new(move |index_value: &[u8]| {
                table.block_reader(&options, index_value)
            }),
        )
    }

    /// Returns the first entry whose key is `>= key`, or `None`.
    ///
    /// When the filter proves `key` absent, `None` is returned without
    /// reading a data block even if a larger key exists, so callers must
    /// check the returned key against their target.
    pub fn get(&self, options: &ReadOptions, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let mut index_iter = self.index_block.iter(self.options.comparator.clone());
        index_iter.seek(key);
        if !index_iter.valid() {
            index_iter.status()?;
            return Ok(None);
        }

        let index_value = index_iter.value();
        if let Some(filter) = &self.filter {
            if let Ok((handle, _)) = BlockHandle::decode_from(index_value) {
                if !filter.key_may_match(handle.offset, key) {
                    trace!(block_offset = handle.offset, "filter excluded key");
                    return Ok(None);
                }
            }
        }

        let mut block_iter = self.block_reader(options, index_value)?;
        block_iter.seek(key);
        let found = if block_iter.valid() {
            Some((block_iter.key().to_vec(), block_iter.value().to_vec()))
        } else {
            None
        };
        block_iter.status()?;
        Ok(found)
    }

    /// Approximate file offset at which the data for `key` begins. Keys
    /// past the last entry map to the offset of the metaindex block, which
    /// is close to the file size.
    pub fn approximate_offset_of(&self, key: &[u8]) -> u64 {
        let mut index_iter = self.index_block.iter(self.options.comparator.clone());
        index_iter.seek(key);
        if index_iter.valid() {
            if let Ok((handle, _)) = BlockHandle::decode_from(index_iter.value()) {
                return handle.offset;
            }
        }
        self.metaindex_handle.offset
    }
}
