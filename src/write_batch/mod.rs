//! # Write Batch Module
//!
//! A [`WriteBatch`] collects puts and deletes that are applied atomically:
//! every record receives a consecutive sequence number starting at the
//! batch's base, so a reader at any sequence number sees either all of the
//! batch or none of it.
//!
//! ## Wire format
//!
//! ```text
//! [sequence: fixed64][count: fixed32]      12-byte header
//! [record]*
//!
//! record := [ValueType::Value: u8][key: varint32 len + bytes][value: varint32 len + bytes]
//!         | [ValueType::Deletion: u8][key: varint32 len + bytes]
//! ```
//!
//! The encoded form is what a durability log would store; see
//! [`WriteBatch::contents`] and [`WriteBatch::set_contents`].


use tracing::{trace, warn};

use crate::encoding::{get_length_prefixed_slice, put_length_prefixed_slice};
use crate::error::{Error, Result};
use crate::keys::{SequenceNumber, ValueType};
use crate::memtable::MemTable;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Sequence number (8 bytes) plus record count (4 bytes).
pub const HEADER_SIZE: usize = 12;

// ------------------------------------------------------------------------------------------------
// Handler
// ------------------------------------------------------------------------------------------------

/// Receives the records of a batch in order from [`WriteBatch::iterate`].
pub trait Handler {
    /// Called for every put record.
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Called for every delete record.
    fn delete(&mut self, key: &[u8]);
}

/// Replays records into a memtable with consecutive sequence numbers.
struct MemTableInserter<'a> {
    sequence: SequenceNumber,
    mem: &'a MemTable,
}

impl Handler for MemTableInserter<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.mem.add(self.sequence, ValueType::Value, key, value);
        self.sequence += 1;
    }

    fn delete(&mut self, key: &[u8]) {
        self.mem.add(self.sequence, ValueType::Deletion, key, &[]);
        self.sequence += 1;
    }
}

// ------------------------------------------------------------------------------------------------
// WriteBatch
// ------------------------------------------------------------------------------------------------

/// Ordered list of updates applied atomically.
///
/// The encoding always holds at least the 12-byte header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    rep: Vec<u8>,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    /// Creates an empty batch with sequence 0.
    pub fn new() -> Self {
        Self {
            rep: vec![0; HEADER_SIZE],
        }
    }

    /// Wraps an encoded batch, such as one read back from a log.
    pub fn from_contents(contents: Vec<u8>) -> Result<Self> {
        if contents.len() < HEADER_SIZE {
            return Err(Error::corruption("malformed WriteBatch (too small)"));
        }
        Ok(Self { rep: contents })
    }

    /// Records a put of `key` -> `value`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.push(ValueType::Value as u8);
        put_length_prefixed_slice(&mut self.rep, key);
        put_length_prefixed_slice(&mut self.rep, value);
    }

    /// Records a deletion of `key`.
    pub fn delete(&mut self, key: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.push(ValueType::Deletion as u8);
        put_length_prefixed_slice(&mut self.rep, key);
    }

    /// Drops every record and resets the header.
    pub fn clear(&mut self) {
        self.rep.clear();
        self.rep.resize(HEADER_SIZE, 0);
    }

    /// Size of the encoded batch. Grows with every record added.
    pub fn approximate_size(&self) -> usize {
        self.rep.len()
    }

    /// Appends the records of `other`, after those of `self`. The sequence
    /// number of `self` is kept.
    pub fn append(&mut self, other: &WriteBatch) {
        self.set_count(self.count() + other.count());
        self.rep.extend_from_slice(&other.rep[HEADER_SIZE..]);
    }

    /// Number of records, as declared by the header.
    pub fn count(&self) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.rep[8..HEADER_SIZE]);
        u32::from_le_bytes(bytes)
    }

    /// Overwrites the record count in the header.
    pub fn set_count(&mut self, count: u32) {
        self.rep[8..HEADER_SIZE].copy_from_slice(&count.to_le_bytes());
    }

    /// Sequence number assigned to the first record.
    pub fn sequence(&self) -> SequenceNumber {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.rep[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Sets the sequence number assigned to the first record.
    pub fn set_sequence(&mut self, sequence: SequenceNumber) {
        self.rep[..8].copy_from_slice(&sequence.to_le_bytes());
    }

    /// The encoded batch.
    pub fn contents(&self) -> &[u8] {
        &self.rep
    }

    /// Replaces the encoded batch. Contents shorter than the header are
    /// rejected and leave the batch unchanged.
    pub fn set_contents(&mut self, contents: &[u8]) -> Result<()> {
        if contents.len() < HEADER_SIZE {
            return Err(Error::corruption("malformed WriteBatch (too small)"));
        }
        self.rep.clear();
        self.rep.extend_from_slice(contents);
        Ok(())
    }

    /// Feeds every record to `handler` in order.
    ///
    /// Records decoded before a malformed one have already been delivered
    /// when the error is returned. A header count that differs from the
    /// number of records is also corruption.
    pub fn iterate(&self, handler: &mut dyn Handler) -> Result<()> {
        let mut input = &self.rep[HEADER_SIZE..];
        let mut found = 0u32;
        while let Some((&tag, rest)) = input.split_first() {
            found = found.wrapping_add(1);
            input = rest;
            match ValueType::try_from(tag) {
                Ok(ValueType::Value) => {
                    let Ok((key, n)) = get_length_prefixed_slice(input) else {
                        return Err(self.corrupt("bad WriteBatch Put"));
                    };
                    let Ok((value, m)) = get_length_prefixed_slice(&input[n..]) else {
                        return Err(self.corrupt("bad WriteBatch Put"));
                    };
                    handler.put(key, value);
                    input = &input[n + m..];
                }
                Ok(ValueType::Deletion) => {
                    let Ok((key, n)) = get_length_prefixed_slice(input) else {
                        return Err(self.corrupt("bad WriteBatch Delete"));
                    };
                    handler.delete(key);
                    input = &input[n..];
                }
                Err(_) => return Err(self.corrupt("unknown WriteBatch tag")),
            }
        }
        if found != self.count() {
            return Err(self.corrupt("WriteBatch has wrong count"));
        }
        Ok(())
    }

    /// Applies the batch to `mem`, assigning sequence numbers
    /// `sequence()..sequence() + count()`.
    ///
    /// On error the records before the malformed one remain in `mem`; the
    /// batch as a whole must be treated as failed.
    pub fn insert_into(&self, mem: &MemTable) -> Result<()> {
        trace!(
            sequence = self.sequence(),
            count = self.count(),
            bytes = self.rep.len(),
            "applying write batch"
        );
        let mut inserter = MemTableInserter {
            sequence: self.sequence(),
            mem,
        };
        self.iterate(&mut inserter)
    }

    fn corrupt(&self, msg: &str) -> Error {
        warn!(
            sequence = self.sequence(),
            count = self.count(),
            bytes = self.rep.len(),
            "{msg}"
        );
        Error::corruption(msg)
    }
}
