//! # Memtable Module
//!
//! The in-memory write buffer. Every write is stored as a distinct
//! internal-key entry; nothing is ever overwritten or removed, so several
//! versions of one user key coexist and are told apart by sequence number.
//!
//! ## Design Overview
//!
//! - Entries live in an append-only [`SkipList`](skiplist::SkipList)
//!   ordered by the [`InternalKeyComparator`]: user key ascending, newest
//!   version first.
//! - Writers are serialized internally; readers and iterators never lock.
//! - Lifetime is shared ownership: iterators hold an `Arc<MemTable>`, so a
//!   table that has been superseded by a newer one stays alive until the
//!   last reader drops it.
//!
//! Resolving the visible value for a snapshot happens above this layer
//! (see [`SnapshotIterator`](crate::iterator::SnapshotIterator)), except
//! for the point lookup in [`MemTable::get`].

pub mod skiplist;

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::encoding::decode_fixed64;
use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::keys::{
    INTERNAL_KEY_TAG_SIZE, InternalKey, InternalKeyComparator, LookupKey, SequenceNumber,
    ValueType,
};

use skiplist::{HEAD, NIL, SkipList};

/// Outcome of [`MemTable::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableGet {
    /// The newest visible version is a value.
    Value(Vec<u8>),
    /// The newest visible version is a tombstone.
    Deleted,
    /// The memtable holds no visible version of the key.
    NotFound,
}

/// Sorted in-memory buffer of internal-key entries.
pub struct MemTable {
    comparator: InternalKeyComparator,
    list: SkipList,
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable")
            .field("entries", &self.list.len())
            .field("memory_usage", &self.list.memory_usage())
            .finish()
    }
}

impl MemTable {
    /// Creates an empty memtable.
    pub fn new(comparator: InternalKeyComparator) -> Self {
        Self {
            list: SkipList::new(Arc::new(comparator.clone())),
            comparator,
        }
    }

    /// Adds an entry for `user_key` at `sequence`. For deletions `value` is
    /// normally empty.
    ///
    /// Sequence numbers must be unique per memtable.
    pub fn add(
        &self,
        sequence: SequenceNumber,
        value_type: ValueType,
        user_key: &[u8],
        value: &[u8],
    ) {
        let key = InternalKey::new(user_key, sequence, value_type);
        trace!(sequence, ?value_type, key_len = user_key.len(), "memtable add");
        self.list.insert(key.into_encoded(), value.to_vec());
    }

    /// Looks up the newest version of `key.user_key()` with a sequence
    /// number `<=` the one `key` was built with.
    pub fn get(&self, key: &LookupKey) -> MemTableGet {
        let node = self.list.find_greater_or_equal(key.internal_key(), None);
        if node == NIL {
            return MemTableGet::NotFound;
        }

        let entry_key = self.list.key(node);
        let Some(split) = entry_key.len().checked_sub(INTERNAL_KEY_TAG_SIZE) else {
            return MemTableGet::NotFound;
        };
        let (user_key, tag) = entry_key.split_at(split);
        if self
            .comparator
            .user_comparator()
            .compare(user_key, key.user_key())
            != Ordering::Equal
        {
            return MemTableGet::NotFound;
        }
        match decode_fixed64(tag).ok().map(|tag| (tag & 0xff) as u8) {
            Some(t) if t == ValueType::Value as u8 => {
                MemTableGet::Value(self.list.value(node).to_vec())
            }
            Some(t) if t == ValueType::Deletion as u8 => MemTableGet::Deleted,
            _ => MemTableGet::NotFound,
        }
    }

    /// Bytes used by entries and the arena reserved for them. Safe to call
    /// while a writer is active.
    pub fn approximate_memory_usage(&self) -> usize {
        self.list.memory_usage()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether no entries have been added.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The ordering of entries.
    pub fn comparator(&self) -> &InternalKeyComparator {
        &self.comparator
    }

    /// Iterator over every entry in internal-key order. Keys are encoded
    /// internal keys.
    ///
    /// Entries added after the iterator was positioned may or may not be
    /// observed; entries already observed never disappear.
    pub fn iter(self: &Arc<Self>) -> MemTableIterator {
        MemTableIterator {
            table: Arc::clone(self),
            node: NIL,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Iterator
// ------------------------------------------------------------------------------------------------

/// Cursor over a [`MemTable`]; keeps the memtable alive.
pub struct MemTableIterator {
    table: Arc<MemTable>,
    node: u32,
}

impl MemTableIterator {
    fn settle(&mut self, node: u32) {
        self.node = if node == HEAD { NIL } else { node };
    }
}

impl StorageIterator for MemTableIterator {
    fn valid(&self) -> bool {
        self.node != NIL
    }

    fn seek_to_first(&mut self) {
        let first = self.table.list.next(HEAD, 0);
        self.settle(first);
    }

    fn seek_to_last(&mut self) {
        let last = self.table.list.find_last();
        self.settle(last);
    }

    fn seek(&mut self, target: &[u8]) {
        let node = self.table.list.find_greater_or_equal(target, None);
        self.settle(node);
    }

    fn next(&mut self) {
        debug_assert!(self.valid());
        let next = self.table.list.next(self.node, 0);
        self.settle(next);
    }

    fn prev(&mut self) {
        debug_assert!(self.valid());
        let list = &self.table.list;
        let prev = list.find_less_than(list.key(self.node));
        self.settle(prev);
    }

    fn key(&self) -> &[u8] {
        self.table.list.key(self.node)
    }

    fn value(&self) -> &[u8] {
        self.table.list.value(self.node)
    }

    fn status(&self) -> Result<()> {
        Ok(())
    }
}
