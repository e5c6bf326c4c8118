//! # Flush Module
//!
//! Turns a full memtable into an immutable table.
//!
//! The caller decides *when* with [`should_flush`] and drives the write with
//! [`write_table`], which drains any sorted internal-key iterator (normally
//! [`MemTable::iter`](crate::memtable::MemTable::iter)) through a
//! [`TableBuilder`]. Tables produced here are keyed by internal keys, so
//! they must be opened with [`table_options`] derived from the same
//! user-level [`Options`].


use std::sync::Arc;

use tracing::debug;

use crate::env::WritableFile;
use crate::error::Result;
use crate::filter::FilterPolicy;
use crate::iterator::StorageIterator;
use crate::keys::{InternalFilterPolicy, InternalKey, InternalKeyComparator};
use crate::memtable::MemTable;
use crate::options::Options;
use crate::table::TableBuilder;

/// Summary of a table written by [`write_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    /// Exact number of bytes written to the sink.
    pub file_size: u64,
    /// Number of entries in the table.
    pub num_entries: u64,
    /// First internal key in the table.
    pub smallest: InternalKey,
    /// Last internal key in the table.
    pub largest: InternalKey,
}

/// Whether `mem` has grown past `options.write_buffer_size`.
pub fn should_flush(mem: &MemTable, options: &Options) -> bool {
    mem.approximate_memory_usage() >= options.write_buffer_size
}

/// Derives the options used for tables keyed by internal keys: the user
/// comparator and filter policy are wrapped so that ordering and filtering
/// apply to the user-key portion.
pub fn table_options(options: &Options) -> Options {
    let filter_policy = options.filter_policy.as_ref().map(|policy| {
        Arc::new(InternalFilterPolicy::new(Arc::clone(policy))) as Arc<dyn FilterPolicy>
    });
    Options {
        comparator: Arc::new(InternalKeyComparator::new(options.comparator.clone())),
        filter_policy,
        ..options.clone()
    }
}

/// Writes every entry of `iter` into `file` as a table, then syncs and
/// closes the file.
///
/// `iter` must yield internal keys in the order of the internal comparator
/// built from `options.comparator`. Returns `None` without touching `file`
/// when the iterator is empty. On error the file holds an unusable prefix
/// and should be discarded.
pub fn write_table<W: WritableFile>(
    iter: &mut dyn StorageIterator,
    options: &Options,
    file: &mut W,
) -> Result<Option<TableMeta>> {
    iter.seek_to_first();
    if !iter.valid() {
        iter.status()?;
        return Ok(None);
    }

    let mut builder = TableBuilder::new(table_options(options), &mut *file)?;
    let smallest = InternalKey::from_encoded(iter.key().to_vec());
    let mut largest = Vec::new();
    while iter.valid() {
        largest.clear();
        largest.extend_from_slice(iter.key());
        if let Err(e) = builder.add(iter.key(), iter.value()) {
            builder.abandon();
            return Err(e);
        }
        iter.next();
    }
    if let Err(e) = iter.status() {
        builder.abandon();
        return Err(e);
    }
    builder.finish()?;

    let meta = TableMeta {
        file_size: builder.file_size(),
        num_entries: builder.num_entries(),
        smallest,
        largest: InternalKey::from_encoded(largest),
    };
    drop(builder);
    file.sync()?;
    file.close()?;

    debug!(
        file_size = meta.file_size,
        entries = meta.num_entries,
        smallest = ?meta.smallest,
        largest = ?meta.largest,
        "memtable flushed"
    );
    Ok(Some(meta))
}
