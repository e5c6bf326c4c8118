//! Append-only skip list over an index-addressed node arena.
//!
//! ```text
//! Level 3:  HEAD ─────────────────────────► 50 ─────────► NIL
//! Level 2:  HEAD ─────────► 20 ───────────► 50 ─────────► NIL
//! Level 1:  HEAD ──► 10 ──► 20 ──► 35 ────► 50 ──► 60 ──► NIL
//! Level 0:  HEAD ──► 10 ──► 20 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
//! ```
//!
//! Nodes live in a segmented arena and refer to their successors by `u32`
//! index. Segment `i` holds `FIRST_SEGMENT_LEN << i` slots and is allocated
//! once, so published nodes never move and are never freed before the list
//! itself. Node 0 is the head sentinel.
//!
//! # Concurrency
//!
//! Inserts are serialized by an internal lock. A new node is fully built
//! and stored in its arena slot before it is linked in, bottom level first,
//! with `Release` stores; readers follow links with `Acquire` loads. A
//! reader therefore sees every node it reaches completely initialized and
//! never needs a lock.

use std::cmp::Ordering as KeyOrdering;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::comparator::Comparator;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Maximum tower height.
pub const MAX_HEIGHT: usize = 12;

/// Inverse of the probability of growing a tower by one level.
const BRANCHING: u32 = 4;

/// Link value meaning "no successor".
pub const NIL: u32 = u32::MAX;

/// Index of the head sentinel.
pub const HEAD: u32 = 0;

const FIRST_SEGMENT_LEN: usize = 64;

const MAX_SEGMENTS: usize = 26;

/// Total slots across all segments, just under `NIL`.
const CAPACITY: u64 = (FIRST_SEGMENT_LEN as u64) * ((1 << MAX_SEGMENTS) - 1);

// ------------------------------------------------------------------------------------------------
// Arena
// ------------------------------------------------------------------------------------------------

struct Node {
    key: Box<[u8]>,
    value: Box<[u8]>,
    next: Box<[AtomicU32]>,
}

/// Maps a node index to `(segment, slot)`.
fn locate(index: u32) -> (usize, usize) {
    let q = index as usize / FIRST_SEGMENT_LEN + 1;
    let segment = (usize::BITS - 1 - q.leading_zeros()) as usize;
    let segment_start = FIRST_SEGMENT_LEN * ((1 << segment) - 1);
    (segment, index as usize - segment_start)
}

struct Arena {
    segments: [OnceLock<Box<[OnceLock<Node>]>>; MAX_SEGMENTS],
    len: AtomicU32,
}

impl Arena {
    fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
            len: AtomicU32::new(0),
        }
    }

    fn get(&self, index: u32) -> Option<&Node> {
        let (segment, slot) = locate(index);
        self.segments.get(segment)?.get()?.get(slot)?.get()
    }

    /// Stores `node` in the next free slot and returns its index together
    /// with the bytes newly reserved for a segment, if one was allocated.
    /// Callers must hold the list's write lock.
    fn push(&self, node: Node) -> (u32, usize) {
        let index = self.len.load(Ordering::Relaxed);
        assert!(u64::from(index) < CAPACITY, "memtable arena exhausted");
        let (segment, slot) = locate(index);

        let mut reserved = 0;
        let slots = self.segments[segment].get_or_init(|| {
            let len = FIRST_SEGMENT_LEN << segment;
            reserved = len * std::mem::size_of::<OnceLock<Node>>();
            (0..len).map(|_| OnceLock::new()).collect()
        });
        // A slot is written exactly once, under the write lock.
        let _ = slots[slot].set(node);
        self.len.store(index + 1, Ordering::Release);
        (index, reserved)
    }
}

// ------------------------------------------------------------------------------------------------
// SkipList
// ------------------------------------------------------------------------------------------------

/// Sorted set of unique keys, each carrying a value.
pub struct SkipList {
    comparator: Arc<dyn Comparator>,
    arena: Arena,
    max_height: AtomicUsize,
    /// Write lock; also the source of tower heights.
    writer: Mutex<StdRng>,
    memory_usage: AtomicUsize,
    len: AtomicUsize,
}

impl SkipList {
    /// Creates an empty list ordered by `comparator`.
    pub fn new(comparator: Arc<dyn Comparator>) -> Self {
        let list = Self {
            comparator,
            arena: Arena::new(),
            max_height: AtomicUsize::new(1),
            writer: Mutex::new(StdRng::seed_from_u64(0xdead_beef)),
            memory_usage: AtomicUsize::new(0),
            len: AtomicUsize::new(0),
        };
        let head = Node {
            key: Box::default(),
            value: Box::default(),
            next: (0..MAX_HEIGHT).map(|_| AtomicU32::new(NIL)).collect(),
        };
        let (index, reserved) = list.arena.push(head);
        debug_assert_eq!(index, HEAD);
        list.memory_usage.store(reserved, Ordering::Relaxed);
        list
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the list holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes reserved by the arena plus the bytes of every key, value and
    /// link stored so far.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage.load(Ordering::Relaxed)
    }

    /// Key of `node`, empty for the head or an unknown index.
    pub fn key(&self, node: u32) -> &[u8] {
        match self.arena.get(node) {
            Some(n) => &n.key[..],
            None => &[],
        }
    }

    /// Value of `node`, empty for the head or an unknown index.
    pub fn value(&self, node: u32) -> &[u8] {
        match self.arena.get(node) {
            Some(n) => &n.value[..],
            None => &[],
        }
    }

    /// Successor of `node` at `level`.
    pub fn next(&self, node: u32, level: usize) -> u32 {
        self.arena
            .get(node)
            .and_then(|n| n.next.get(level))
            .map_or(NIL, |link| link.load(Ordering::Acquire))
    }

    fn key_is_after_node(&self, key: &[u8], node: u32) -> bool {
        node != NIL && self.comparator.compare(self.key(node), key) == KeyOrdering::Less
    }

    fn random_height(rng: &mut StdRng) -> usize {
        let mut height = 1;
        while height < MAX_HEIGHT && rng.random_ratio(1, BRANCHING) {
            height += 1;
        }
        height
    }

    /// First node with key `>= key`, or [`NIL`]. Fills `prev` with the
    /// rightmost node before that position on every level.
    pub fn find_greater_or_equal(&self, key: &[u8], mut prev: Option<&mut [u32; MAX_HEIGHT]>) -> u32 {
        let mut node = HEAD;
        let mut level = self.max_height.load(Ordering::Relaxed) - 1;
        loop {
            let next = self.next(node, level);
            if self.key_is_after_node(key, next) {
                node = next;
            } else {
                if let Some(prev) = prev.as_deref_mut() {
                    prev[level] = node;
                }
                if level == 0 {
                    return next;
                }
                level -= 1;
            }
        }
    }

    /// Last node with key `< key`, or [`HEAD`].
    pub fn find_less_than(&self, key: &[u8]) -> u32 {
        let mut node = HEAD;
        let mut level = self.max_height.load(Ordering::Relaxed) - 1;
        loop {
            let next = self.next(node, level);
            if self.key_is_after_node(key, next) {
                node = next;
            } else if level == 0 {
                return node;
            } else {
                level -= 1;
            }
        }
    }

    /// Last node in the list, or [`HEAD`] when empty.
    pub fn find_last(&self) -> u32 {
        let mut node = HEAD;
        let mut level = self.max_height.load(Ordering::Relaxed) - 1;
        loop {
            let next = self.next(node, level);
            if next != NIL {
                node = next;
            } else if level == 0 {
                return node;
            } else {
                level -= 1;
            }
        }
    }

    /// Inserts `key`, which must not compare equal to any key already in
    /// the list.
    pub fn insert(&self, key: Vec<u8>, value: Vec<u8>) {
        let mut rng = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut prev = [HEAD; MAX_HEIGHT];
        let found = self.find_greater_or_equal(&key, Some(&mut prev));
        debug_assert!(
            found == NIL || self.comparator.compare(self.key(found), &key) != KeyOrdering::Equal,
            "duplicate key inserted into skip list"
        );

        let height = Self::random_height(&mut rng);
        let max_height = self.max_height.load(Ordering::Relaxed);
        if height > max_height {
            // prev[max_height..height] already holds HEAD. Readers that see
            // the new height before the links simply drop a level at NIL.
            self.max_height.store(height, Ordering::Relaxed);
        }

        let used = key.len() + value.len() + height * std::mem::size_of::<AtomicU32>();
        let node = Node {
            key: key.into_boxed_slice(),
            value: value.into_boxed_slice(),
            next: prev[..height]
                .iter()
                .enumerate()
                .map(|(level, &p)| AtomicU32::new(self.next(p, level)))
                .collect(),
        };
        let (index, reserved) = self.arena.push(node);

        for (level, &p) in prev[..height].iter().enumerate() {
            if let Some(link) = self.arena.get(p).and_then(|n| n.next.get(level)) {
                link.store(index, Ordering::Release);
            }
        }

        self.memory_usage
            .fetch_add(used + reserved, Ordering::Relaxed);
        self.len.fetch_add(1, Ordering::Release);
    }
}
