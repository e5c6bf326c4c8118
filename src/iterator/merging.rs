use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::Comparator;
use crate::error::Result;
use crate::iterator::StorageIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// Merges several sorted children into one sorted stream.
///
/// Children are expected to hold disjoint keys (internal keys differ in
/// their sequence numbers), so the merged stream of internal keys lists
/// every version of a user key newest first regardless of which child
/// holds it. On exact key ties the earlier child wins when moving forward.
///
/// The current child is found by a linear scan, which beats a heap for the
/// handful of children a merge usually has.
pub struct MergingIterator {
    comparator: Arc<dyn Comparator>,
    children: Vec<Box<dyn StorageIterator>>,
    current: Option<usize>,
    direction: Direction,
}

impl MergingIterator {
    /// Merges `children` under `comparator`.
    pub fn new(comparator: Arc<dyn Comparator>, children: Vec<Box<dyn StorageIterator>>) -> Self {
        Self {
            comparator,
            children,
            current: None,
            direction: Direction::Forward,
        }
    }

    fn find_smallest(&mut self) {
        let mut smallest: Option<usize> = None;
        for (i, child) in self.children.iter().enumerate() {
            if !child.valid() {
                continue;
            }
            let better = match smallest {
                None => true,
                Some(s) => {
                    self.comparator.compare(child.key(), self.children[s].key()) == Ordering::Less
                }
            };
            if better {
                smallest = Some(i);
            }
        }
        self.current = smallest;
    }

    fn find_largest(&mut self) {
        let mut largest: Option<usize> = None;
        for (i, child) in self.children.iter().enumerate().rev() {
            if !child.valid() {
                continue;
            }
            let better = match largest {
                None => true,
                Some(l) => {
                    self.comparator.compare(child.key(), self.children[l].key())
                        == Ordering::Greater
                }
            };
            if better {
                largest = Some(i);
            }
        }
        self.current = largest;
    }
}

impl StorageIterator for MergingIterator {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn seek_to_first(&mut self) {
        for child in &mut self.children {
            child.seek_to_first();
        }
        self.find_smallest();
        self.direction = Direction::Forward;
    }

    fn seek_to_last(&mut self) {
        for child in &mut self.children {
            child.seek_to_last();
        }
        self.find_largest();
        self.direction = Direction::Reverse;
    }

    fn seek(&mut self, target: &[u8]) {
        for child in &mut self.children {
            child.seek(target);
        }
        self.find_smallest();
        self.direction = Direction::Forward;
    }

    fn next(&mut self) {
        let Some(current) = self.current else {
            return;
        };

        // Every non-current child must sit after key(). When moving
        // forward that already holds; after a reverse move it has to be
        // re-established.
        if self.direction != Direction::Forward {
            let key = self.children[current].key().to_vec();
            for (i, child) in self.children.iter_mut().enumerate() {
                if i == current {
                    continue;
                }
                child.seek(&key);
                if child.valid() && self.comparator.compare(&key, child.key()) == Ordering::Equal {
                    child.next();
                }
            }
            self.direction = Direction::Forward;
        }

        self.children[current].next();
        self.find_smallest();
    }

    fn prev(&mut self) {
        let Some(current) = self.current else {
            return;
        };

        // Every non-current child must sit before key().
        if self.direction != Direction::Reverse {
            let key = self.children[current].key().to_vec();
            for (i, child) in self.children.iter_mut().enumerate() {
                if i == current {
                    continue;
                }
                child.seek(&key);
                if child.valid() {
                    // Child is at the first entry >= key(); step back.
                    child.prev();
                } else {
                    // Child has no entries >= key(); its last entry is < key().
                    child.seek_to_last();
                }
            }
            self.direction = Direction::Reverse;
        }

        self.children[current].prev();
        self.find_largest();
    }

    fn key(&self) -> &[u8] {
        match self.current {
            Some(i) => self.children[i].key(),
            None => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match self.current {
            Some(i) => self.children[i].value(),
            None => &[],
        }
    }

    fn status(&self) -> Result<()> {
        self.children.iter().try_for_each(|child| child.status())
    }
}
