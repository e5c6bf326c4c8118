//! Pluggable total orders over byte strings.
//!
//! A [`Comparator`] defines the order every sorted structure in this crate
//! is built on (memtable, blocks, tables, merging iterators), plus two
//! key-shortening hooks used by the table builder to keep index entries
//! small:
//!
//! - [`find_shortest_separator`](Comparator::find_shortest_separator)
//!   shortens `start` to some `s` with `start <= s < limit`.
//! - [`find_short_successor`](Comparator::find_short_successor) shortens
//!   `key` to some `s >= key`.
//!
//! Both hooks may leave their input unchanged; that is always correct,
//! just less compact.
//!
//! # Provided comparators
//!
//! - [`BytewiseComparator`]: lexicographic unsigned byte order. A shared
//!   instance is available through [`bytewise_comparator`].
//! - [`ReverseComparator`]: orders keys by their byte-reversed form under
//!   a wrapped comparator.
//!
//! The comparator's [`name`](Comparator::name) is persisted alongside data
//! built with it; changing the order of an existing comparator without
//! renaming it makes existing tables unreadable.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// A total order over byte strings, shared across threads.
pub trait Comparator: Send + Sync {
    /// Stable identifier of this ordering.
    fn name(&self) -> &str;

    /// Three-way comparison of `a` and `b`.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// If `start < limit`, may rewrite `start` to a shorter string in
    /// `[start, limit)`.
    fn find_shortest_separator(&self, start: &mut Vec<u8>, limit: &[u8]);

    /// May rewrite `key` to a shorter string that is `>= key`.
    fn find_short_successor(&self, key: &mut Vec<u8>);
}

impl fmt::Debug for dyn Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Comparator").field(&self.name()).finish()
    }
}

// ------------------------------------------------------------------------------------------------
// Bytewise
// ------------------------------------------------------------------------------------------------

/// Lexicographic order over unsigned bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytewiseComparator;

static BYTEWISE: LazyLock<Arc<BytewiseComparator>> = LazyLock::new(|| Arc::new(BytewiseComparator));

/// Returns the process-wide bytewise comparator.
pub fn bytewise_comparator() -> Arc<dyn Comparator> {
    BYTEWISE.clone()
}

impl Comparator for BytewiseComparator {
    fn name(&self) -> &str {
        "leveldb.BytewiseComparator"
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn find_shortest_separator(&self, start: &mut Vec<u8>, limit: &[u8]) {
        let min_len = start.len().min(limit.len());
        let diff_index = start
            .iter()
            .zip(limit)
            .take_while(|(a, b)| a == b)
            .count();

        if diff_index >= min_len {
            // One is a prefix of the other.
            return;
        }

        let diff_byte = start[diff_index];
        if diff_byte < 0xff && diff_byte + 1 < limit[diff_index] {
            start[diff_index] += 1;
            start.truncate(diff_index + 1);
            debug_assert_eq!(self.compare(start, limit), Ordering::Less);
        }
    }

    fn find_short_successor(&self, key: &mut Vec<u8>) {
        if let Some(i) = key.iter().position(|&b| b != 0xff) {
            key[i] += 1;
            key.truncate(i + 1);
        }
        // A run of 0xff bytes has no shorter successor.
    }
}

// ------------------------------------------------------------------------------------------------
// Reverse
// ------------------------------------------------------------------------------------------------

/// Orders keys by comparing their byte-reversed forms under `inner`.
///
/// Shortening hooks run in the reversed space, so the results stay
/// consistent with the reversed order.
pub struct ReverseComparator {
    inner: Arc<dyn Comparator>,
    name: String,
}

impl ReverseComparator {
    /// Wraps `inner`; the name is derived from the inner comparator's.
    pub fn new(inner: Arc<dyn Comparator>) -> Self {
        let name = match inner.name().strip_prefix("leveldb.") {
            Some(base) => format!("leveldb.Reverse{base}"),
            None => format!("Reverse{}", inner.name()),
        };
        Self { inner, name }
    }
}

impl Default for ReverseComparator {
    fn default() -> Self {
        Self::new(bytewise_comparator())
    }
}

fn reversed(key: &[u8]) -> Vec<u8> {
    key.iter().rev().copied().collect()
}

impl Comparator for ReverseComparator {
    fn name(&self) -> &str {
        &self.name
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.inner.compare(&reversed(a), &reversed(b))
    }

    fn find_shortest_separator(&self, start: &mut Vec<u8>, limit: &[u8]) {
        let mut s = reversed(start);
        self.inner.find_shortest_separator(&mut s, &reversed(limit));
        s.reverse();
        *start = s;
    }

    fn find_short_successor(&self, key: &mut Vec<u8>) {
        key.reverse();
        self.inner.find_short_successor(key);
        key.reverse();
    }
}
