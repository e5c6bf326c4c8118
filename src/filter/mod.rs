//! Probabilistic membership filters.
//!
//! A [`FilterPolicy`] turns a batch of keys into an opaque byte string and
//! later answers "might this key be in the batch?". Answers of `false` are
//! definite; answers of `true` may be false positives.
//!
//! [`BloomFilterPolicy`] is the standard implementation. Its filter layout
//! is:
//!
//! ```text
//! +-----------------------------+---------+
//! | bit array (>= 64 bits)      | k (u8)  |
//! +-----------------------------+---------+
//! ```
//!
//! where `k` is the number of probes. Probe positions come from double
//! hashing of a single 32-bit [`hash`](crate::util::hash) per key.
//!
//! Table files embed filters through the filter block (see
//! [`FilterBlockBuilder`] / [`FilterBlockReader`]), which keeps one filter
//! per fixed-size range of data-block offsets.

mod block;


use std::sync::{Arc, LazyLock};

pub use block::{FILTER_BASE_LG, FilterBlockBuilder, FilterBlockReader};

use crate::util::hash;

// ------------------------------------------------------------------------------------------------
// Policy trait
// ------------------------------------------------------------------------------------------------

/// Builds and queries compact membership summaries over key sets.
pub trait FilterPolicy: Send + Sync {
    /// Identifier persisted in the table's metaindex; changing the filter
    /// encoding requires changing the name.
    fn name(&self) -> &str;

    /// Appends a filter summarizing `keys` to `dst`.
    ///
    /// `keys` may contain duplicates and is not necessarily sorted.
    fn create_filter(&self, keys: &[&[u8]], dst: &mut Vec<u8>);

    /// Returns `false` only if `key` was certainly not among the keys
    /// `filter` was built from.
    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> bool;
}

// ------------------------------------------------------------------------------------------------
// Bloom filter
// ------------------------------------------------------------------------------------------------

const BLOOM_HASH_SEED: u32 = 0xbc9f_1d34;

/// Upper bound on probes; filters claiming more are treated as a future
/// encoding and match everything.
const MAX_PROBES: usize = 30;

/// Minimum bit-array size, avoiding very high false-positive rates for
/// tiny key sets.
const MIN_FILTER_BITS: usize = 64;

#[inline]
fn bloom_hash(key: &[u8]) -> u32 {
    hash(key, BLOOM_HASH_SEED)
}

/// Bloom filter with a configurable number of bits per key.
///
/// With 10 bits per key the false-positive rate is close to 1%.
#[derive(Debug, Clone)]
pub struct BloomFilterPolicy {
    bits_per_key: usize,
    k: usize,
}

impl BloomFilterPolicy {
    /// Creates a policy using `bits_per_key` bits of filter per key.
    pub fn new(bits_per_key: usize) -> Self {
        // ln(2) * bits_per_key minimizes the false-positive rate.
        let k = ((bits_per_key as f64) * 0.69) as usize;
        Self {
            bits_per_key,
            k: k.clamp(1, MAX_PROBES),
        }
    }

    /// Number of probes per key.
    pub fn num_probes(&self) -> usize {
        self.k
    }
}

static DEFAULT_POLICY: LazyLock<Arc<BloomFilterPolicy>> =
    LazyLock::new(|| Arc::new(BloomFilterPolicy::new(10)));

/// Returns the shared 10-bits-per-key bloom policy.
pub fn default_filter_policy() -> Arc<dyn FilterPolicy> {
    DEFAULT_POLICY.clone()
}

impl FilterPolicy for BloomFilterPolicy {
    fn name(&self) -> &str {
        "leveldb.BuiltinBloomFilter2"
    }

    fn create_filter(&self, keys: &[&[u8]], dst: &mut Vec<u8>) {
        let bits = (keys.len() * self.bits_per_key).max(MIN_FILTER_BITS);
        let bytes = bits.div_ceil(8);
        let bits = bytes * 8;

        let init_size = dst.len();
        dst.resize(init_size + bytes, 0);
        dst.push(self.k as u8);

        let array = &mut dst[init_size..init_size + bytes];
        for key in keys {
            let mut h = bloom_hash(key);
            let delta = h.rotate_right(17);
            for _ in 0..self.k {
                let bit_pos = (h as usize) % bits;
                array[bit_pos / 8] |= 1 << (bit_pos % 8);
                h = h.wrapping_add(delta);
            }
        }
    }

    fn key_may_match(&self, key: &[u8], filter: &[u8]) -> bool {
        let Some((&k, array)) = filter.split_last() else {
            return false;
        };
        if array.is_empty() {
            return false;
        }
        if k as usize > MAX_PROBES {
            // Reserved for encodings with more probes; treat as a match.
            return true;
        }
        let bits = array.len() * 8;

        let mut h = bloom_hash(key);
        let delta = h.rotate_right(17);
        for _ in 0..k {
            let bit_pos = (h as usize) % bits;
            if array[bit_pos / 8] & (1 << (bit_pos % 8)) == 0 {
                return false;
            }
            h = h.wrapping_add(delta);
        }
        true
    }
}
