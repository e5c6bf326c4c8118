//! Shared fixtures: a vector-backed iterator and internal-key builders.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::iterator::StorageIterator;
use crate::keys::{InternalKey, ValueType};

/// Sorted in-memory entries behind the iterator protocol.
pub struct VecIterator {
    comparator: Arc<dyn Comparator>,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
    error: Option<Error>,
}

impl VecIterator {
    /// `entries` are sorted here with `comparator`.
    pub fn new(comparator: Arc<dyn Comparator>, mut entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        entries.sort_by(|a, b| comparator.compare(&a.0, &b.0));
        let pos = entries.len();
        Self {
            comparator,
            entries,
            pos,
            error: None,
        }
    }

    pub fn boxed(
        comparator: Arc<dyn Comparator>,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Box<dyn StorageIterator> {
        Box::new(Self::new(comparator, entries))
    }

    pub fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }
}

impl StorageIterator for VecIterator {
    fn valid(&self) -> bool {
        self.pos < self.entries.len()
    }

    fn seek_to_first(&mut self) {
        self.pos = 0;
    }

    fn seek_to_last(&mut self) {
        self.pos = if self.entries.is_empty() {
            0
        } else {
            self.entries.len() - 1
        };
    }

    fn seek(&mut self, target: &[u8]) {
        self.pos = self
            .entries
            .partition_point(|(k, _)| self.comparator.compare(k, target) == Ordering::Less);
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn prev(&mut self) {
        self.pos = if self.pos == 0 {
            self.entries.len()
        } else {
            self.pos - 1
        };
    }

    fn key(&self) -> &[u8] {
        &self.entries[self.pos].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos].1
    }

    fn status(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub fn kv(key: &[u8], value: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (key.to_vec(), value.to_vec())
}

pub fn put(user_key: &[u8], seq: u64, value: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (
        InternalKey::new(user_key, seq, ValueType::Value)
            .encode()
            .to_vec(),
        value.to_vec(),
    )
}

pub fn del(user_key: &[u8], seq: u64) -> (Vec<u8>, Vec<u8>) {
    (
        InternalKey::new(user_key, seq, ValueType::Deletion)
            .encode()
            .to_vec(),
        Vec::new(),
    )
}

/// Forward scan as owned pairs.
pub fn scan_forward(iter: &mut dyn StorageIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        out.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    out
}

/// Backward scan as owned pairs, in the order visited.
pub fn scan_backward(iter: &mut dyn StorageIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    iter.seek_to_last();
    while iter.valid() {
        out.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.prev();
    }
    out
}
