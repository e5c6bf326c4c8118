use std::cmp::Ordering;
use std::sync::Arc;

use tracing::warn;

use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::iterator::StorageIterator;
use crate::keys::{
    InternalKey, ParsedInternalKey, SequenceNumber, VALUE_TYPE_FOR_SEEK, ValueType,
    extract_user_key,
};
use crate::util::EscapedBytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// `inner` is positioned at the entry that yields `key()`/`value()`.
    Forward,
    /// `inner` is positioned just before all entries for the current user
    /// key, whose newest visible value is cached in `saved_*`.
    Reverse,
}

/// The logical view of a merged internal-key stream at a sequence number.
///
/// For every user key, only the newest entry with sequence `<= sequence`
/// is considered; if that entry is a tombstone the key is hidden. Keys and
/// seek targets are user keys.
pub struct SnapshotIterator {
    inner: Box<dyn StorageIterator>,
    user_comparator: Arc<dyn Comparator>,
    sequence: SequenceNumber,
    direction: Direction,
    valid: bool,
    /// Forward: user key being skipped. Reverse: current user key.
    saved_key: Vec<u8>,
    /// Reverse only: current value.
    saved_value: Vec<u8>,
    status: Option<Error>,
}

impl SnapshotIterator {
    /// Wraps `inner`, which must yield internal keys ordered by the internal
    /// comparator built from `user_comparator`.
    pub fn new(
        inner: Box<dyn StorageIterator>,
        user_comparator: Arc<dyn Comparator>,
        sequence: SequenceNumber,
    ) -> Self {
        Self {
            inner,
            user_comparator,
            sequence,
            direction: Direction::Forward,
            valid: false,
            saved_key: Vec::new(),
            saved_value: Vec::new(),
            status: None,
        }
    }

    /// Parses the inner key, recording a corruption on failure.
    fn parse_inner_key(&mut self) -> Option<(Vec<u8>, SequenceNumber, ValueType)> {
        match ParsedInternalKey::parse(self.inner.key()) {
            Ok(parsed) => Some((parsed.user_key.to_vec(), parsed.sequence, parsed.value_type)),
            Err(e) => {
                warn!(key = %EscapedBytes(self.inner.key()), %e, "skipping malformed internal key");
                if self.status.is_none() {
                    self.status = Some(Error::corruption(format!(
                        "corrupted internal key in snapshot iterator: {e}"
                    )));
                }
                None
            }
        }
    }

    /// Advances `inner` to the next visible entry. When `skipping`, entries
    /// whose user key is `<= saved_key` are hidden.
    fn find_next_user_entry(&mut self, mut skipping: bool) {
        debug_assert!(self.inner.valid());
        debug_assert_eq!(self.direction, Direction::Forward);
        loop {
            if let Some((user_key, sequence, value_type)) = self.parse_inner_key() {
                if sequence <= self.sequence {
                    match value_type {
                        ValueType::Deletion => {
                            // Hide every older entry for this user key.
                            self.saved_key = user_key;
                            skipping = true;
                        }
                        ValueType::Value => {
                            let hidden = skipping
                                && self.user_comparator.compare(&user_key, &self.saved_key)
                                    != Ordering::Greater;
                            if !hidden {
                                self.valid = true;
                                self.saved_key.clear();
                                return;
                            }
                        }
                    }
                }
            }
            self.inner.next();
            if !self.inner.valid() {
                break;
            }
        }
        self.saved_key.clear();
        self.valid = false;
    }

    /// Moves `inner` backwards until the newest visible value of the
    /// previous user key is cached.
    fn find_prev_user_entry(&mut self) {
        debug_assert_eq!(self.direction, Direction::Reverse);

        let mut value_type = ValueType::Deletion;
        while self.inner.valid() {
            if let Some((user_key, sequence, entry_type)) = self.parse_inner_key() {
                if sequence <= self.sequence {
                    if value_type != ValueType::Deletion
                        && self.user_comparator.compare(&user_key, &self.saved_key)
                            == Ordering::Less
                    {
                        // Found a non-deleted value for the key after it.
                        break;
                    }
                    value_type = entry_type;
                    if value_type == ValueType::Deletion {
                        self.saved_key.clear();
                        self.saved_value.clear();
                    } else {
                        self.saved_key = user_key;
                        self.saved_value.clear();
                        self.saved_value.extend_from_slice(self.inner.value());
                    }
                }
            }
            self.inner.prev();
        }

        if value_type == ValueType::Deletion {
            // End of iteration.
            self.valid = false;
            self.saved_key.clear();
            self.saved_value.clear();
            self.direction = Direction::Forward;
        } else {
            self.valid = true;
        }
    }
}

impl StorageIterator for SnapshotIterator {
    fn valid(&self) -> bool {
        self.valid
    }

    fn seek_to_first(&mut self) {
        self.direction = Direction::Forward;
        self.saved_value.clear();
        self.inner.seek_to_first();
        if self.inner.valid() {
            self.find_next_user_entry(false);
        } else {
            self.valid = false;
        }
    }

    fn seek_to_last(&mut self) {
        self.direction = Direction::Reverse;
        self.saved_value.clear();
        self.inner.seek_to_last();
        self.find_prev_user_entry();
    }

    fn seek(&mut self, target: &[u8]) {
        self.direction = Direction::Forward;
        self.saved_value.clear();
        self.saved_key.clear();
        let key = InternalKey::new(target, self.sequence, VALUE_TYPE_FOR_SEEK);
        self.inner.seek(key.encode());
        if self.inner.valid() {
            self.find_next_user_entry(false);
        } else {
            self.valid = false;
        }
    }

    fn next(&mut self) {
        debug_assert!(self.valid);

        if self.direction == Direction::Reverse {
            self.direction = Direction::Forward;
            // `inner` is before every entry of key(); step into them, then
            // skip them using saved_key, which still holds key().
            if self.inner.valid() {
                self.inner.next();
            } else {
                self.inner.seek_to_first();
            }
            if !self.inner.valid() {
                self.valid = false;
                self.saved_key.clear();
                return;
            }
        } else {
            self.saved_key.clear();
            self.saved_key
                .extend_from_slice(extract_user_key(self.inner.key()));
            self.inner.next();
            if !self.inner.valid() {
                self.valid = false;
                self.saved_key.clear();
                return;
            }
        }

        self.find_next_user_entry(true);
    }

    fn prev(&mut self) {
        debug_assert!(self.valid);

        if self.direction == Direction::Forward {
            // `inner` is at the current entry; back up until before every
            // entry of key().
            self.saved_key.clear();
            self.saved_key
                .extend_from_slice(extract_user_key(self.inner.key()));
            loop {
                self.inner.prev();
                if !self.inner.valid() {
                    self.valid = false;
                    self.saved_key.clear();
                    self.saved_value.clear();
                    return;
                }
                if self
                    .user_comparator
                    .compare(extract_user_key(self.inner.key()), &self.saved_key)
                    == Ordering::Less
                {
                    break;
                }
            }
            self.direction = Direction::Reverse;
        }

        self.find_prev_user_entry();
    }

    fn key(&self) -> &[u8] {
        match self.direction {
            Direction::Forward => extract_user_key(self.inner.key()),
            Direction::Reverse => &self.saved_key,
        }
    }

    fn value(&self) -> &[u8] {
        match self.direction {
            Direction::Forward => self.inner.value(),
            Direction::Reverse => &self.saved_value,
        }
    }

    fn status(&self) -> Result<()> {
        match &self.status {
            Some(e) => Err(e.clone()),
            None => self.inner.status(),
        }
    }
}
