//! Builders and model checks shared by the table tests.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::Subscriber;

use crate::comparator::{Comparator, ReverseComparator, bytewise_comparator};
use crate::env::MemoryFile;
use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::options::{Options, ReadOptions};
use crate::table::{Block, BlockBuilder, Table, TableBuilder};

pub type Entries = Vec<(Vec<u8>, Vec<u8>)>;

pub fn init_tracing() {
    let _ = Subscriber::builder()
        .with_max_level(Level::TRACE)
        .try_init();
}

pub fn comparators() -> Vec<Arc<dyn Comparator>> {
    vec![bytewise_comparator(), Arc::new(ReverseComparator::default())]
}

/// Sorts `entries` under `cmp`, keeping the first of any equal keys.
pub fn sorted(cmp: &dyn Comparator, mut entries: Entries) -> Entries {
    entries.sort_by(|a, b| cmp.compare(&a.0, &b.0));
    entries.dedup_by(|a, b| cmp.compare(&a.0, &b.0) == Ordering::Equal);
    entries
}

/// `count` keys sharing long prefixes, with values of varying length.
pub fn sample_entries(count: usize) -> Entries {
    (0..count)
        .map(|i| {
            (
                format!("key-{:05}", i * 7).into_bytes(),
                vec![b'a' + (i % 26) as u8; i % 37],
            )
        })
        .collect()
}

pub fn build_block(cmp: Arc<dyn Comparator>, restart_interval: usize, entries: &Entries) -> Block {
    let mut builder = BlockBuilder::new(cmp, restart_interval);
    for (k, v) in entries {
        builder.add(k, v);
    }
    Block::new(builder.finish().to_vec()).unwrap()
}

/// Builds a table in memory and returns its bytes.
pub fn build_table(options: &Options, entries: &Entries) -> Vec<u8> {
    let mut builder = TableBuilder::new(options.clone(), Vec::new()).unwrap();
    for (k, v) in entries {
        builder.add(k, v).unwrap();
    }
    builder.finish().unwrap();
    assert_eq!(builder.num_entries(), entries.len() as u64);
    let file_size = builder.file_size();
    let bytes = builder.into_file();
    assert_eq!(file_size, bytes.len() as u64);
    bytes
}

pub fn open_table(options: &Options, bytes: Vec<u8>) -> Result<Arc<Table>> {
    let size = bytes.len() as u64;
    Table::open(options.clone(), Arc::new(MemoryFile::new(bytes)), size)
}

pub fn table_iter(table: &Arc<Table>) -> Box<dyn StorageIterator> {
    Box::new(table.iter(ReadOptions {
        verify_checksums: true,
    }))
}

/// Seek targets around every model key: the key itself, a slightly larger
/// and a slightly smaller string, plus both extremes.
fn probes(model: &Entries) -> Vec<Vec<u8>> {
    let mut out = vec![Vec::new(), vec![0xff; 8]];
    for (k, _) in model {
        out.push(k.clone());
        let mut longer = k.clone();
        longer.push(0);
        out.push(longer);
        if let Some((_, shorter)) = k.split_last() {
            out.push(shorter.to_vec());
        }
    }
    out
}

/// Checks forward scan, backward scan and seeks against a sorted model.
pub fn check_against_model(cmp: &dyn Comparator, iter: &mut dyn StorageIterator, model: &Entries) {
    let mut forward = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        forward.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    assert_eq!(&forward, model, "forward scan");

    let mut backward = Vec::new();
    iter.seek_to_last();
    while iter.valid() {
        backward.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.prev();
    }
    backward.reverse();
    assert_eq!(&backward, model, "backward scan");

    for target in probes(model) {
        let expected = model.partition_point(|(k, _)| cmp.compare(k, &target) == Ordering::Less);
        iter.seek(&target);
        match model.get(expected) {
            Some((k, v)) => {
                assert!(iter.valid(), "seek({target:?}) should land on {k:?}");
                assert_eq!(iter.key(), k.as_slice());
                assert_eq!(iter.value(), v.as_slice());
                // One step in each direction from the landing point.
                iter.prev();
                match expected.checked_sub(1).and_then(|i| model.get(i)) {
                    Some((pk, _)) => assert_eq!(iter.key(), pk.as_slice()),
                    None => assert!(!iter.valid()),
                }
            }
            None => assert!(!iter.valid(), "seek({target:?}) should be past the end"),
        }
    }
    iter.status().unwrap();
}
