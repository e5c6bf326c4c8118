//! Read side of the block format.
//!
//! A [`Block`] owns immutable, already-uncompressed contents and validates
//! the restart array on construction. [`BlockIter`] walks it:
//!
//! - `seek` binary-searches the restart array for the last restart whose key
//!   is `< target`, then scans forward;
//! - `prev` steps back to the restart preceding the current entry and
//!   re-scans forward, so it is not O(1);
//! - malformed entries invalidate the iterator and set a `Corruption`
//!   status instead of panicking.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::encoding::{decode_fixed32, get_varint32};
use crate::error::{Error, Result};
use crate::iterator::StorageIterator;

// ------------------------------------------------------------------------------------------------
// Block
// ------------------------------------------------------------------------------------------------

/// Immutable block contents plus the location of its restart array.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Debug, Clone)]
pub struct Block {
    data: Arc<[u8]>,
    restart_offset: usize,
    num_restarts: usize,
}

impl Block {
    /// Validates the restart trailer of `contents` and wraps it.
    ///
    /// A block with zero restarts is accepted and yields an iterator that
    /// is never valid.
    pub fn new(contents: Vec<u8>) -> Result<Self> {
        let len = contents.len();
        if len < 4 {
            return Err(Error::corruption("bad block contents"));
        }
        let num_restarts = decode_fixed32(&contents[len - 4..])? as usize;
        let max_restarts = (len - 4) / 4;
        if num_restarts > max_restarts {
            return Err(Error::corruption("bad block contents"));
        }
        Ok(Self {
            restart_offset: len - (1 + num_restarts) * 4,
            num_restarts,
            data: contents.into(),
        })
    }

    /// Total size of the block contents in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of entries in the restart array.
    pub fn num_restarts(&self) -> usize {
        self.num_restarts
    }

    /// Returns a fresh iterator ordered by `comparator`.
    pub fn iter(&self, comparator: Arc<dyn Comparator>) -> BlockIter {
        BlockIter {
            data: Arc::clone(&self.data),
            comparator,
            restarts: self.restart_offset,
            num_restarts: self.num_restarts,
            current: self.restart_offset,
            restart_index: self.num_restarts,
            key: Vec::new(),
            value_offset: 0,
            value_len: 0,
            status: None,
        }
    }
}

/// Decodes an entry header from the front of `entry`.
///
/// Returns `(shared, non_shared, value_len, header_len)`, or `None` when the
/// header is malformed or the key delta and value run past the end.
#[inline]
fn decode_entry(entry: &[u8]) -> Option<(usize, usize, usize, usize)> {
    if entry.len() < 3 {
        return None;
    }
    let (shared, non_shared, value_len, header_len) = if (entry[0] | entry[1] | entry[2]) < 0x80
    {
        // All three lengths fit in one byte.
        (
            u32::from(entry[0]),
            u32::from(entry[1]),
            u32::from(entry[2]),
            3,
        )
    } else {
        let (shared, a) = get_varint32(entry).ok()?;
        let (non_shared, b) = get_varint32(&entry[a..]).ok()?;
        let (value_len, c) = get_varint32(&entry[a + b..]).ok()?;
        (shared, non_shared, value_len, a + b + c)
    };
    let (non_shared, value_len) = (non_shared as usize, value_len as usize);
    if entry.len() - header_len < non_shared + value_len {
        return None;
    }
    Some((shared as usize, non_shared, value_len, header_len))
}

// ------------------------------------------------------------------------------------------------
// Block iterator
// ------------------------------------------------------------------------------------------------

/// Bidirectional cursor over a [`Block`].
pub struct BlockIter {
    data: Arc<[u8]>,
    comparator: Arc<dyn Comparator>,
    /// Offset of the restart array; also the "invalid" position.
    restarts: usize,
    num_restarts: usize,
    /// Offset of the current entry; `>= restarts` when invalid.
    current: usize,
    /// Restart block containing `current`.
    restart_index: usize,
    key: Vec<u8>,
    value_offset: usize,
    value_len: usize,
    status: Option<Error>,
}

impl BlockIter {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.comparator.compare(a, b)
    }

    fn next_entry_offset(&self) -> usize {
        self.value_offset + self.value_len
    }

    fn restart_point(&self, index: usize) -> usize {
        debug_assert!(index < self.num_restarts);
        self.data
            .get(self.restarts + index * 4..)
            .and_then(|bytes| decode_fixed32(bytes).ok())
            .map_or(self.restarts, |offset| offset as usize)
    }

    fn seek_to_restart_point(&mut self, index: usize) {
        self.key.clear();
        self.restart_index = index;
        // parse_next_key() starts at next_entry_offset().
        self.value_offset = self.restart_point(index);
        self.value_len = 0;
    }

    fn mark_invalid(&mut self) {
        self.current = self.restarts;
        self.restart_index = self.num_restarts;
    }

    fn corruption_error(&mut self) {
        self.mark_invalid();
        self.key.clear();
        self.value_offset = 0;
        self.value_len = 0;
        if self.status.is_none() {
            self.status = Some(Error::corruption("bad entry in block"));
        }
    }

    fn parse_next_key(&mut self) -> bool {
        self.current = self.next_entry_offset();
        if self.current >= self.restarts {
            self.mark_invalid();
            return false;
        }

        let decoded = self
            .data
            .get(self.current..self.restarts)
            .and_then(decode_entry);
        match decoded {
            Some((shared, non_shared, value_len, header_len)) if shared <= self.key.len() => {
                let key_start = self.current + header_len;
                self.key.truncate(shared);
                self.key
                    .extend_from_slice(&self.data[key_start..key_start + non_shared]);
                self.value_offset = key_start + non_shared;
                self.value_len = value_len;
                while self.restart_index + 1 < self.num_restarts
                    && self.restart_point(self.restart_index + 1) < self.current
                {
                    self.restart_index += 1;
                }
                true
            }
            _ => {
                self.corruption_error();
                false
            }
        }
    }

    /// Full key stored at restart `index`, or `None` when that entry is not
    /// a well-formed restart (non-zero shared prefix).
    fn restart_key(&self, index: usize) -> Option<&[u8]> {
        let offset = self.restart_point(index);
        let entry = self.data.get(offset..self.restarts)?;
        let (shared, non_shared, _, header_len) = decode_entry(entry)?;
        if shared != 0 {
            return None;
        }
        Some(&entry[header_len..header_len + non_shared])
    }
}

impl StorageIterator for BlockIter {
    fn valid(&self) -> bool {
        self.current < self.restarts
    }

    fn seek_to_first(&mut self) {
        if self.num_restarts == 0 {
            return;
        }
        self.seek_to_restart_point(0);
        self.parse_next_key();
    }

    fn seek_to_last(&mut self) {
        if self.num_restarts == 0 {
            return;
        }
        self.seek_to_restart_point(self.num_restarts - 1);
        while self.parse_next_key() && self.next_entry_offset() < self.restarts {}
    }

    fn seek(&mut self, target: &[u8]) {
        if self.num_restarts == 0 {
            return;
        }

        let mut left = 0;
        let mut right = self.num_restarts - 1;
        let mut current_key_order = Ordering::Equal;
        if self.valid() {
            // Narrow the search using the current position.
            current_key_order = self.compare(&self.key, target);
            match current_key_order {
                Ordering::Less => left = self.restart_index,
                Ordering::Greater => right = self.restart_index,
                Ordering::Equal => return,
            }
        }

        while left < right {
            let mid = (left + right + 1) / 2;
            let order = match self.restart_key(mid) {
                Some(mid_key) => self.compare(mid_key, target),
                None => {
                    self.corruption_error();
                    return;
                }
            };
            if order == Ordering::Less {
                left = mid;
            } else {
                right = mid - 1;
            }
        }

        // Keep scanning from the current entry when it already sits in the
        // chosen restart block before the target.
        let skip_seek = left == self.restart_index && current_key_order == Ordering::Less;
        if !skip_seek {
            self.seek_to_restart_point(left);
        }
        loop {
            if !self.parse_next_key() {
                return;
            }
            if self.compare(&self.key, target) != Ordering::Less {
                return;
            }
        }
    }

    fn next(&mut self) {
        debug_assert!(self.valid());
        self.parse_next_key();
    }

    fn prev(&mut self) {
        debug_assert!(self.valid());
        let original = self.current;
        while self.restart_point(self.restart_index) >= original {
            if self.restart_index == 0 {
                self.mark_invalid();
                return;
            }
            self.restart_index -= 1;
        }
        self.seek_to_restart_point(self.restart_index);
        while self.parse_next_key() && self.next_entry_offset() < original {}
    }

    fn key(&self) -> &[u8] {
        debug_assert!(self.valid());
        &self.key
    }

    fn value(&self) -> &[u8] {
        debug_assert!(self.valid());
        &self.data[self.value_offset..self.value_offset + self.value_len]
    }

    fn status(&self) -> Result<()> {
        match &self.status {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
