//! Prefix-compressed block encoder.
//!
//! ```text
//! entry   := [shared: varint32][non_shared: varint32][value_len: varint32]
//!            [key_delta: non_shared bytes][value: value_len bytes]
//! block   := entry* [restart: fixed32]* [num_restarts: fixed32]
//! ```
//!
//! Every `restart_interval` entries the full key is stored (`shared == 0`)
//! and its offset is recorded in the restart array, which is what makes
//! binary search possible on the read side.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::encoding::{put_fixed32, put_varint32};

/// Accumulates sorted entries into the block format.
pub struct BlockBuilder {
    comparator: Arc<dyn Comparator>,
    restart_interval: usize,
    buffer: Vec<u8>,
    restarts: Vec<u32>,
    counter: usize,
    finished: bool,
    last_key: Vec<u8>,
}

impl BlockBuilder {
    /// Creates an empty builder. `restart_interval` must be at least 1.
    pub fn new(comparator: Arc<dyn Comparator>, restart_interval: usize) -> Self {
        assert!(restart_interval >= 1, "restart_interval must be >= 1");
        Self {
            comparator,
            restart_interval,
            buffer: Vec::new(),
            restarts: vec![0],
            counter: 0,
            finished: false,
            last_key: Vec::new(),
        }
    }

    /// Discards all entries so the builder can be reused after [`finish`](Self::finish).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.restarts.clear();
        self.restarts.push(0);
        self.counter = 0;
        self.finished = false;
        self.last_key.clear();
    }

    /// Whether no entries were added since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Size of the block if it were finished now.
    pub fn current_size_estimate(&self) -> usize {
        self.buffer.len() + self.restarts.len() * 4 + 4
    }

    /// Appends an entry.
    ///
    /// # Preconditions
    ///
    /// `key` must be strictly greater than every key added since the last
    /// reset, and [`finish`](Self::finish) must not have been called. Out of
    /// order keys produce a malformed block; this is only checked in debug
    /// builds.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        debug_assert!(!self.finished, "add() after finish()");
        debug_assert!(self.counter <= self.restart_interval);
        debug_assert!(
            self.is_empty() || self.comparator.compare(key, &self.last_key) == Ordering::Greater,
            "keys must be added in increasing order"
        );

        let shared = if self.counter < self.restart_interval {
            self.last_key
                .iter()
                .zip(key)
                .take_while(|(a, b)| a == b)
                .count()
        } else {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
            0
        };
        let non_shared = key.len() - shared;

        put_varint32(&mut self.buffer, shared as u32);
        put_varint32(&mut self.buffer, non_shared as u32);
        put_varint32(&mut self.buffer, value.len() as u32);
        self.buffer.extend_from_slice(&key[shared..]);
        self.buffer.extend_from_slice(value);

        self.last_key.truncate(shared);
        self.last_key.extend_from_slice(&key[shared..]);
        debug_assert_eq!(self.last_key, key);
        self.counter += 1;
    }

    /// Appends the restart array and returns the finished block. The slice
    /// stays valid until the builder is reset or dropped.
    pub fn finish(&mut self) -> &[u8] {
        if !self.finished {
            for &restart in &self.restarts {
                put_fixed32(&mut self.buffer, restart);
            }
            put_fixed32(&mut self.buffer, self.restarts.len() as u32);
            self.finished = true;
        }
        &self.buffer
    }
}
