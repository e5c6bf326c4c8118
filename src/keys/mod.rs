//! Internal keys: user keys tagged with a sequence number and operation.
//!
//! Every entry stored in a memtable, block or table is keyed by an
//! *internal key*:
//!
//! ```text
//! +----------------+--------------------------------------+
//! | user_key bytes | fixed64 LE: (sequence << 8) | type   |
//! +----------------+--------------------------------------+
//! ```
//!
//! Internal keys sort by user key ascending (under the configured user
//! [`Comparator`]) and then by the packed `(sequence, type)` tag
//! **descending**, so the newest write for a user key comes first.
//!
//! Only the outermost read path (see
//! [`UserKeyIterator`](crate::iterator::UserKeyIterator) and
//! [`SnapshotIterator`](crate::iterator::SnapshotIterator)) strips the tag
//! back off.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::encoding::{decode_fixed64, put_fixed64};
use crate::error::{Error, Result};
use crate::filter::FilterPolicy;
use crate::util::EscapedBytes;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Monotonic per-write counter.
pub type SequenceNumber = u64;

/// Largest representable sequence number; the low 8 bits of the packed
/// tag hold the value type.
pub const MAX_SEQUENCE_NUMBER: SequenceNumber = (1 << 56) - 1;

/// Size of the packed `(sequence, type)` suffix.
pub const INTERNAL_KEY_TAG_SIZE: usize = 8;

/// Operation recorded for an internal key.
///
/// The discriminants are persisted and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Tombstone.
    Deletion = 0,
    /// Live value.
    Value = 1,
}

/// The type used when building a key to seek to: since the tag sorts
/// descending, the highest type makes the seek key sort before every entry
/// with the same user key and sequence.
pub const VALUE_TYPE_FOR_SEEK: ValueType = ValueType::Value;

impl TryFrom<u8> for ValueType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ValueType::Deletion),
            1 => Ok(ValueType::Value),
            other => Err(Error::corruption(format!(
                "invalid internal key type {other}"
            ))),
        }
    }
}

/// Packs `sequence` and `value_type` into the 64-bit tag.
#[inline]
pub fn pack_sequence_and_type(sequence: SequenceNumber, value_type: ValueType) -> u64 {
    debug_assert!(sequence <= MAX_SEQUENCE_NUMBER);
    (sequence << 8) | value_type as u64
}

// ------------------------------------------------------------------------------------------------
// Parsed / encoded forms
// ------------------------------------------------------------------------------------------------

/// Borrowed, decoded view of an internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInternalKey<'a> {
    /// User portion of the key.
    pub user_key: &'a [u8],
    /// Sequence number of the write.
    pub sequence: SequenceNumber,
    /// Operation type.
    pub value_type: ValueType,
}

impl<'a> ParsedInternalKey<'a> {
    /// Builds a parsed key from its parts.
    pub fn new(user_key: &'a [u8], sequence: SequenceNumber, value_type: ValueType) -> Self {
        Self {
            user_key,
            sequence,
            value_type,
        }
    }

    /// Decodes an internal key.
    ///
    /// Fails with [`Error::Corruption`] when the 8-byte tag is missing or
    /// its type byte is unknown.
    pub fn parse(internal_key: &'a [u8]) -> Result<Self> {
        let n = internal_key.len();
        if n < INTERNAL_KEY_TAG_SIZE {
            return Err(Error::corruption(format!(
                "internal key too short ({n} bytes)"
            )));
        }
        let tag = decode_fixed64(&internal_key[n - INTERNAL_KEY_TAG_SIZE..])?;
        let value_type = ValueType::try_from((tag & 0xff) as u8)?;
        Ok(Self {
            user_key: &internal_key[..n - INTERNAL_KEY_TAG_SIZE],
            sequence: tag >> 8,
            value_type,
        })
    }

    /// Length of the encoded form.
    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + INTERNAL_KEY_TAG_SIZE
    }
}

impl fmt::Display for ParsedInternalKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' @ {} : {}",
            EscapedBytes(self.user_key),
            self.sequence,
            self.value_type as u8
        )
    }
}

/// Appends the encoding of `key` to `dst`.
pub fn append_internal_key(dst: &mut Vec<u8>, key: &ParsedInternalKey<'_>) {
    dst.extend_from_slice(key.user_key);
    put_fixed64(dst, pack_sequence_and_type(key.sequence, key.value_type));
}

/// Returns the user-key portion of an encoded internal key.
///
/// Keys shorter than the tag yield an empty user key; use
/// [`ParsedInternalKey::parse`] where malformed input must be detected.
#[inline]
pub fn extract_user_key(internal_key: &[u8]) -> &[u8] {
    &internal_key[..internal_key.len().saturating_sub(INTERNAL_KEY_TAG_SIZE)]
}

#[inline]
fn extract_tag(internal_key: &[u8]) -> u64 {
    let n = internal_key.len();
    if n < INTERNAL_KEY_TAG_SIZE {
        return 0;
    }
    decode_fixed64(&internal_key[n - INTERNAL_KEY_TAG_SIZE..]).unwrap_or(0)
}

/// Owned, encoded internal key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InternalKey {
    rep: Vec<u8>,
}

impl InternalKey {
    /// Encodes `(user_key, sequence, value_type)`.
    pub fn new(user_key: &[u8], sequence: SequenceNumber, value_type: ValueType) -> Self {
        let mut rep = Vec::with_capacity(user_key.len() + INTERNAL_KEY_TAG_SIZE);
        append_internal_key(
            &mut rep,
            &ParsedInternalKey::new(user_key, sequence, value_type),
        );
        Self { rep }
    }

    /// Wraps already-encoded bytes without validation.
    pub fn from_encoded(rep: Vec<u8>) -> Self {
        Self { rep }
    }

    /// The encoded bytes.
    pub fn encode(&self) -> &[u8] {
        &self.rep
    }

    /// Consumes the key, returning the encoded bytes.
    pub fn into_encoded(self) -> Vec<u8> {
        self.rep
    }

    /// The user-key portion.
    pub fn user_key(&self) -> &[u8] {
        extract_user_key(&self.rep)
    }

    /// Decodes the key.
    pub fn parse(&self) -> Result<ParsedInternalKey<'_>> {
        ParsedInternalKey::parse(&self.rep)
    }
}

impl fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parse() {
            Ok(parsed) => write!(f, "{parsed}"),
            Err(_) => write!(f, "(bad){}", EscapedBytes(&self.rep)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// LookupKey
// ------------------------------------------------------------------------------------------------

/// Key used for point lookups at a given snapshot.
///
/// Encodes `(user_key, sequence, VALUE_TYPE_FOR_SEEK)`, which sorts before
/// every entry for `user_key` with a sequence number `<= sequence`.
#[derive(Debug, Clone)]
pub struct LookupKey {
    key: InternalKey,
}

impl LookupKey {
    /// Builds the seek key for `user_key` visible at `sequence`.
    pub fn new(user_key: &[u8], sequence: SequenceNumber) -> Self {
        Self {
            key: InternalKey::new(user_key, sequence, VALUE_TYPE_FOR_SEEK),
        }
    }

    /// The encoded internal key.
    pub fn internal_key(&self) -> &[u8] {
        self.key.encode()
    }

    /// The user key.
    pub fn user_key(&self) -> &[u8] {
        self.key.user_key()
    }
}

// ------------------------------------------------------------------------------------------------
// InternalKeyComparator
// ------------------------------------------------------------------------------------------------

/// Orders internal keys: user key ascending, then packed tag descending.
#[derive(Clone)]
pub struct InternalKeyComparator {
    user_comparator: Arc<dyn Comparator>,
}

impl InternalKeyComparator {
    /// Wraps the user-key order.
    pub fn new(user_comparator: Arc<dyn Comparator>) -> Self {
        Self { user_comparator }
    }

    /// The wrapped user-key comparator.
    pub fn user_comparator(&self) -> &Arc<dyn Comparator> {
        &self.user_comparator
    }

    /// Appends the maximal seek tag to a shortened user key if that made
    /// it physically shorter yet logically larger than `user_key`.
    fn adopt_shortened(&self, original: &mut Vec<u8>, user_key: &[u8], mut shortened: Vec<u8>) {
        if shortened.len() < user_key.len()
            && self.user_comparator.compare(user_key, &shortened) == Ordering::Less
        {
            put_fixed64(
                &mut shortened,
                pack_sequence_and_type(MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK),
            );
            debug_assert_eq!(self.compare(original, &shortened), Ordering::Less);
            *original = shortened;
        }
    }
}

impl fmt::Debug for InternalKeyComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalKeyComparator")
            .field("user_comparator", &self.user_comparator.name())
            .finish()
    }
}

impl Comparator for InternalKeyComparator {
    fn name(&self) -> &str {
        "leveldb.InternalKeyComparator"
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.user_comparator
            .compare(extract_user_key(a), extract_user_key(b))
            .then_with(|| extract_tag(b).cmp(&extract_tag(a)))
    }

    fn find_shortest_separator(&self, start: &mut Vec<u8>, limit: &[u8]) {
        let user_start = extract_user_key(start).to_vec();
        let user_limit = extract_user_key(limit);
        let mut shortened = user_start.clone();
        self.user_comparator
            .find_shortest_separator(&mut shortened, user_limit);
        self.adopt_shortened(start, &user_start, shortened);
    }

    fn find_short_successor(&self, key: &mut Vec<u8>) {
        let user_key = extract_user_key(key).to_vec();
        let mut shortened = user_key.clone();
        self.user_comparator.find_short_successor(&mut shortened);
        self.adopt_shortened(key, &user_key, shortened);
    }
}

// ------------------------------------------------------------------------------------------------
// InternalFilterPolicy
// ------------------------------------------------------------------------------------------------

/// Adapts a user-key [`FilterPolicy`] to tables keyed by internal keys by
/// stripping the tag before hashing.
pub struct InternalFilterPolicy {
    user_policy: Arc<dyn FilterPolicy>,
}

impl InternalFilterPolicy {
    /// Wraps `user_policy`.
    pub fn new(user_policy: Arc<dyn FilterPolicy>) -> Self {
        Self { user_policy }
    }
}

impl FilterPolicy for InternalFilterPolicy {
    fn name(&self) -> &str {
        self.user_policy.name()
    }

    fn create_filter(&self, keys: &[&[u8]], dst: &mut Vec<u8>) {
        let user_keys: Vec<&[u8]> = keys.iter().map(|k| extract_user_key(k)).collect();
        self.user_policy.create_filter(&user_keys, dst);
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> bool {
        self.user_policy
            .key_may_match(extract_user_key(key), filter)
    }
}
