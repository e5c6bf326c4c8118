//! Table writer.
//!
//! [`TableBuilder`] accepts keys in strictly increasing order and streams a
//! complete table into a [`WritableFile`]:
//!
//! 1. Entries are packed into data blocks; a block is written once its
//!    estimated size reaches `options.block_size`.
//! 2. The index entry for a block is deferred until the first key of the
//!    next block is known, so that the shortest separator between the two
//!    can be stored instead of the full last key.
//! 3. `finish` writes the filter block (if any), the metaindex block, the
//!    index block and the footer, in that order.
//!
//! Errors are sticky: once a write fails, every later call returns the same
//! error and the output must be discarded.

use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::comparator::bytewise_comparator;
use crate::encoding::{Encode, encode_to_vec};
use crate::env::WritableFile;
use crate::error::{Error, Result};
use crate::filter::FilterBlockBuilder;
use crate::options::{CompressionType, Options};

use super::block_builder::BlockBuilder;
use super::format::{BlockHandle, Footer, write_raw_block};

// ------------------------------------------------------------------------------------------------
// Block I/O helpers
// ------------------------------------------------------------------------------------------------

/// Compresses `raw` if requested and worthwhile, then writes it with its
/// trailer.
fn write_block<W: WritableFile>(
    file: &mut W,
    offset: &mut u64,
    snappy: &mut snap::raw::Encoder,
    compression: CompressionType,
    raw: &[u8],
) -> Result<BlockHandle> {
    match compression {
        CompressionType::None => write_raw_block(file, offset, raw, CompressionType::None),
        CompressionType::Snappy => match snappy.compress_vec(raw) {
            // Keep the compressed form only if it saves at least 12.5%.
            Ok(compressed) if compressed.len() < raw.len() - raw.len() / 8 => {
                write_raw_block(file, offset, &compressed, CompressionType::Snappy)
            }
            _ => write_raw_block(file, offset, raw, CompressionType::None),
        },
    }
}

// ------------------------------------------------------------------------------------------------
// TableBuilder
// ------------------------------------------------------------------------------------------------

/// Streams sorted entries into the table format.
///
/// The builder exclusively owns its sink until [`into_file`](Self::into_file).
pub struct TableBuilder<W: WritableFile> {
    options: Options,
    file: W,
    offset: u64,
    status: Option<Error>,
    data_block: BlockBuilder,
    index_block: BlockBuilder,
    last_key: Vec<u8>,
    num_entries: u64,
    closed: bool,
    filter_block: Option<FilterBlockBuilder>,
    snappy: snap::raw::Encoder,
    /// Set after a data block is flushed and cleared once its index entry
    /// is written.
    pending_index_entry: bool,
    pending_handle: BlockHandle,
}

impl<W: WritableFile> TableBuilder<W> {
    /// Creates a builder writing to `file`, which should be empty.
    pub fn new(options: Options, file: W) -> Result<Self> {
        options.validate()?;
        let mut filter_block = options
            .filter_policy
            .clone()
            .map(|policy| FilterBlockBuilder::new(policy, options.filter_base_lg));
        if let Some(filter) = filter_block.as_mut() {
            filter.start_block(0);
        }
        Ok(Self {
            data_block: BlockBuilder::new(
                options.comparator.clone(),
                options.block_restart_interval,
            ),
            index_block: BlockBuilder::new(options.comparator.clone(), 1),
            options,
            file,
            offset: 0,
            status: None,
            last_key: Vec::new(),
            num_entries: 0,
            closed: false,
            filter_block,
            snappy: snap::raw::Encoder::new(),
            pending_index_entry: false,
            pending_handle: BlockHandle::default(),
        })
    }

    /// First error encountered, if any.
    pub fn status(&self) -> Result<()> {
        match &self.status {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if self.status.is_none() {
                self.status = Some(e.clone());
            }
        }
        result
    }

    /// Appends an entry.
    ///
    /// # Preconditions
    ///
    /// `key` is strictly greater than every previously added key under
    /// `options.comparator`, and neither [`finish`](Self::finish) nor
    /// [`abandon`](Self::abandon) has been called. Violations are checked
    /// only in debug builds.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        debug_assert!(!self.closed, "add() after finish() or abandon()");
        self.status()?;
        debug_assert!(
            self.num_entries == 0
                || self.options.comparator.compare(key, &self.last_key) == Ordering::Greater,
            "keys must be added in increasing order"
        );

        if self.pending_index_entry {
            debug_assert!(self.data_block.is_empty());
            self.options
                .comparator
                .find_shortest_separator(&mut self.last_key, key);
            let handle_encoding = encode_to_vec(&self.pending_handle);
            self.index_block.add(&self.last_key, &handle_encoding);
            self.pending_index_entry = false;
        }

        if let Some(filter) = self.filter_block.as_mut() {
            filter.add_key(key);
        }

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.num_entries += 1;
        self.data_block.add(key, value);

        if self.data_block.current_size_estimate() >= self.options.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the buffered data block, if any. Usually called internally;
    /// callers may use it to force two adjacent entries into different
    /// blocks.
    pub fn flush(&mut self) -> Result<()> {
        debug_assert!(!self.closed, "flush() after finish() or abandon()");
        self.status()?;
        if self.data_block.is_empty() {
            return Ok(());
        }
        debug_assert!(!self.pending_index_entry);

        let raw = self.data_block.finish();
        let raw_len = raw.len();
        let written = write_block(
            &mut self.file,
            &mut self.offset,
            &mut self.snappy,
            self.options.compression,
            raw,
        );
        self.data_block.reset();
        self.pending_handle = self.record(written)?;
        self.pending_index_entry = true;

        let flushed = self.file.flush();
        self.record(flushed)?;

        if let Some(filter) = self.filter_block.as_mut() {
            filter.start_block(self.offset);
        }
        trace!(
            offset = self.pending_handle.offset,
            raw_len,
            stored_len = self.pending_handle.size,
            "data block flushed"
        );
        Ok(())
    }

    /// Writes the remaining blocks and the footer. The builder must not be
    /// used for writes afterwards.
    pub fn finish(&mut self) -> Result<()> {
        self.flush()?;
        debug_assert!(!self.closed, "finish() called twice");
        self.closed = true;

        // Filter block, always stored uncompressed.
        let filter_handle = match self.filter_block.as_mut() {
            Some(filter) => {
                let contents = filter.finish();
                let written = write_raw_block(
                    &mut self.file,
                    &mut self.offset,
                    contents,
                    CompressionType::None,
                );
                Some(self.record(written)?)
            }
            None => None,
        };

        // Metaindex block.
        let mut meta_index_block = BlockBuilder::new(bytewise_comparator(), 1);
        if let (Some(policy), Some(handle)) = (&self.options.filter_policy, filter_handle) {
            let key = format!("filter.{}", policy.name());
            meta_index_block.add(key.as_bytes(), &encode_to_vec(&handle));
        }
        let written = write_block(
            &mut self.file,
            &mut self.offset,
            &mut self.snappy,
            self.options.compression,
            meta_index_block.finish(),
        );
        let metaindex_handle = self.record(written)?;

        // Index block.
        if self.pending_index_entry {
            self.options
                .comparator
                .find_short_successor(&mut self.last_key);
            let handle_encoding = encode_to_vec(&self.pending_handle);
            self.index_block.add(&self.last_key, &handle_encoding);
            self.pending_index_entry = false;
        }
        let written = write_block(
            &mut self.file,
            &mut self.offset,
            &mut self.snappy,
            self.options.compression,
            self.index_block.finish(),
        );
        let index_handle = self.record(written)?;

        // Footer.
        let mut footer = Vec::new();
        Footer {
            metaindex_handle,
            index_handle,
        }
        .encode_to(&mut footer);
        let appended = self.file.append(&footer);
        self.record(appended)?;
        self.offset += footer.len() as u64;

        debug!(
            entries = self.num_entries,
            file_size = self.offset,
            "table finished"
        );
        Ok(())
    }

    /// Stops building without writing the trailing blocks. The sink holds
    /// an unusable prefix afterwards.
    pub fn abandon(&mut self) {
        debug_assert!(!self.closed, "abandon() after finish()");
        self.closed = true;
    }

    /// Number of entries added so far.
    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Bytes written to the sink so far. After a successful
    /// [`finish`](Self::finish) this is the final file size.
    pub fn file_size(&self) -> u64 {
        self.offset
    }

    /// Borrows the sink.
    pub fn file(&self) -> &W {
        &self.file
    }

    /// Releases the sink.
    pub fn into_file(self) -> W {
        self.file
    }
}
