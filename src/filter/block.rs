//! Filter block: one filter per range of data-block offsets.
//!
//! # Layout
//!
//! ```text
//! [filter 0]
//! [filter 1]
//! ...
//! [filter N-1]
//! [u32 offset of filter 0]        <- offset array
//! ...
//! [u32 offset of filter N-1]
//! [u32 offset of offset array]
//! [u8  base_lg]
//! ```
//!
//! Filter `i` covers every data block whose file offset lies in
//! `[i << base_lg, (i + 1) << base_lg)`. Keys are added while the table
//! builder streams entries; a new filter is cut whenever the next data
//! block starts in a later range, independent of block boundaries.

use std::sync::Arc;

use crate::encoding::{decode_fixed32, put_fixed32};
use crate::filter::FilterPolicy;

/// Default `base_lg`: one filter per 2 KiB of data-block offset.
pub const FILTER_BASE_LG: u8 = 11;

/// Accumulates keys and emits the filter block.
pub struct FilterBlockBuilder {
    policy: Arc<dyn FilterPolicy>,
    base_lg: u8,
    /// Flattened key contents for the pending filter.
    keys: Vec<u8>,
    /// Start offset of each pending key within `keys`.
    starts: Vec<usize>,
    /// Filters emitted so far, followed later by the offset array.
    result: Vec<u8>,
    filter_offsets: Vec<u32>,
}

impl FilterBlockBuilder {
    /// Creates a builder emitting filters with `policy`.
    pub fn new(policy: Arc<dyn FilterPolicy>, base_lg: u8) -> Self {
        Self {
            policy,
            base_lg,
            keys: Vec::new(),
            starts: Vec::new(),
            result: Vec::new(),
            filter_offsets: Vec::new(),
        }
    }

    /// Announces that the next data block starts at `block_offset`.
    ///
    /// Offsets must be non-decreasing across calls.
    pub fn start_block(&mut self, block_offset: u64) {
        let filter_index = (block_offset >> self.base_lg) as usize;
        assert!(filter_index >= self.filter_offsets.len());
        while filter_index > self.filter_offsets.len() {
            self.generate_filter();
        }
    }

    /// Adds `key` to the current filter.
    pub fn add_key(&mut self, key: &[u8]) {
        self.starts.push(self.keys.len());
        self.keys.extend_from_slice(key);
    }

    /// Emits any pending filter and returns the complete block contents.
    pub fn finish(&mut self) -> &[u8] {
        if !self.starts.is_empty() {
            self.generate_filter();
        }

        let array_offset = self.result.len() as u32;
        for &offset in &self.filter_offsets {
            put_fixed32(&mut self.result, offset);
        }
        put_fixed32(&mut self.result, array_offset);
        self.result.push(self.base_lg);
        &self.result
    }

    fn generate_filter(&mut self) {
        self.filter_offsets.push(self.result.len() as u32);
        if self.starts.is_empty() {
            // Empty range: zero-length filter.
            return;
        }

        self.starts.push(self.keys.len());
        let keys: Vec<&[u8]> = self
            .starts
            .windows(2)
            .map(|w| &self.keys[w[0]..w[1]])
            .collect();
        self.policy.create_filter(&keys, &mut self.result);

        self.keys.clear();
        self.starts.clear();
    }
}

/// Answers membership queries against a filter block.
pub struct FilterBlockReader {
    policy: Arc<dyn FilterPolicy>,
    data: Vec<u8>,
    /// Start of the offset array within `data`.
    offset: usize,
    num: usize,
    base_lg: u8,
}

impl FilterBlockReader {
    /// Parses `contents`. Malformed contents produce a reader that reports
    /// every key as a possible match.
    pub fn new(policy: Arc<dyn FilterPolicy>, contents: Vec<u8>) -> Self {
        let mut reader = Self {
            policy,
            data: Vec::new(),
            offset: 0,
            num: 0,
            base_lg: 0,
        };

        let n = contents.len();
        if n < 5 {
            return reader;
        }
        let base_lg = contents[n - 1];
        let last_word = match decode_fixed32(&contents[n - 5..]) {
            Ok(w) => w as usize,
            Err(_) => return reader,
        };
        if last_word > n - 5 {
            return reader;
        }

        reader.base_lg = base_lg;
        reader.offset = last_word;
        reader.num = (n - 5 - last_word) / 4;
        reader.data = contents;
        reader
    }

    /// Returns `false` only if `key` is certainly absent from the data
    /// block starting at `block_offset`.
    pub fn key_may_match(&self, block_offset: u64, key: &[u8]) -> bool {
        let index = block_offset.checked_shr(u32::from(self.base_lg)).unwrap_or(0) as usize;
        if index >= self.num {
            // Errors are treated as potential matches.
            return true;
        }

        let entry = self.offset + index * 4;
        let (Ok(start), Ok(limit)) = (
            decode_fixed32(&self.data[entry..]),
            decode_fixed32(&self.data[entry + 4..]),
        ) else {
            return true;
        };
        let (start, limit) = (start as usize, limit as usize);

        if start <= limit && limit <= self.offset {
            if start == limit {
                // Empty filters do not match any keys.
                return false;
            }
            return self.policy.key_may_match(key, &self.data[start..limit]);
        }
        true
    }
}
