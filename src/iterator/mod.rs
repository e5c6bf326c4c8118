//! The cursor protocol shared by every sorted source, and its wrappers.
//!
//! # Design Overview
//!
//! Blocks, tables and memtables each expose a [`StorageIterator`]. The
//! protocol is pull-based and bidirectional:
//!
//! - [`seek_to_first`](StorageIterator::seek_to_first),
//!   [`seek_to_last`](StorageIterator::seek_to_last) and
//!   [`seek`](StorageIterator::seek) (first entry `>= target`) position
//!   the cursor;
//! - [`next`](StorageIterator::next) and [`prev`](StorageIterator::prev)
//!   move it, and require [`valid`](StorageIterator::valid);
//! - [`key`](StorageIterator::key) and [`value`](StorageIterator::value)
//!   borrow the current entry until the next movement.
//!
//! Decode errors found while moving do not abort traversal. The iterator
//! becomes invalid and reports the error from
//! [`status`](StorageIterator::status), so entries read before the
//! corruption point remain usable.
//!
//! # Wrappers
//!
//! - [`TwoLevelIterator`]: walks an index iterator and lazily opens one
//!   data iterator per index entry (table iteration).
//! - [`MergingIterator`]: merges any number of children into one ordered
//!   stream.
//! - [`UserKeyIterator`]: strips the internal-key tag, surfacing parse
//!   failures as corruption.
//! - [`SnapshotIterator`]: the logical view at a sequence number: newest
//!   visible version per user key, tombstones hidden.
//! - [`EmptyIterator`]: never valid; optionally carries an error.

mod merging;
mod snapshot;
mod two_level;
mod user_key;

#[cfg(test)]
mod tests;

pub use merging::MergingIterator;
pub use snapshot::SnapshotIterator;
pub use two_level::{BlockFunction, TwoLevelIterator};
pub use user_key::UserKeyIterator;

use crate::error::{Error, Result};

/// Bidirectional cursor over a sorted key/value source.
pub trait StorageIterator: Send {
    /// Whether the cursor is positioned at an entry.
    fn valid(&self) -> bool;

    /// Positions at the first entry, if any.
    fn seek_to_first(&mut self);

    /// Positions at the last entry, if any.
    fn seek_to_last(&mut self);

    /// Positions at the first entry with key `>= target`.
    fn seek(&mut self, target: &[u8]);

    /// Advances to the next entry. Requires `valid()`.
    fn next(&mut self);

    /// Steps back to the previous entry. Requires `valid()`.
    fn prev(&mut self);

    /// Current key. Requires `valid()`.
    fn key(&self) -> &[u8];

    /// Current value. Requires `valid()`.
    fn value(&self) -> &[u8];

    /// First error encountered, if any.
    fn status(&self) -> Result<()>;
}

impl<I: StorageIterator + ?Sized> StorageIterator for Box<I> {
    fn valid(&self) -> bool {
        (**self).valid()
    }

    fn seek_to_first(&mut self) {
        (**self).seek_to_first();
    }

    fn seek_to_last(&mut self) {
        (**self).seek_to_last();
    }

    fn seek(&mut self, target: &[u8]) {
        (**self).seek(target);
    }

    fn next(&mut self) {
        (**self).next();
    }

    fn prev(&mut self) {
        (**self).prev();
    }

    fn key(&self) -> &[u8] {
        (**self).key()
    }

    fn value(&self) -> &[u8] {
        (**self).value()
    }

    fn status(&self) -> Result<()> {
        (**self).status()
    }
}

/// Iterator over nothing. Optionally reports `error` from `status()`.
#[derive(Debug, Default)]
pub struct EmptyIterator {
    error: Option<Error>,
}

impl EmptyIterator {
    /// An empty iterator with an OK status.
    pub fn new() -> Self {
        Self { error: None }
    }

    /// An empty iterator whose status is `error`.
    pub fn with_error(error: Error) -> Self {
        Self { error: Some(error) }
    }
}

impl StorageIterator for EmptyIterator {
    fn valid(&self) -> bool {
        false
    }

    fn seek_to_first(&mut self) {}

    fn seek_to_last(&mut self) {}

    fn seek(&mut self, _target: &[u8]) {}

    fn next(&mut self) {}

    fn prev(&mut self) {}

    fn key(&self) -> &[u8] {
        &[]
    }

    fn value(&self) -> &[u8] {
        &[]
    }

    fn status(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Drains `iter` from the first entry into owned pairs. Stops at the first
/// error.
pub fn collect_entries<I: StorageIterator + ?Sized>(
    iter: &mut I,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut out = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        out.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    iter.status()?;
    Ok(out)
}
