//! # lsmcore
//!
//! The data path of an embeddable **Log-Structured Merge Tree (LSM-tree)**
//! key-value store: the pieces a database façade composes into writes,
//! flushes and snapshot reads.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use lsmcore::flush::{table_options, write_table};
//! use lsmcore::iterator::{SnapshotIterator, collect_entries};
//! use lsmcore::keys::InternalKeyComparator;
//! use lsmcore::{MemTable, MemoryFile, Options, ReadOptions, Table, WriteBatch};
//!
//! let options = Options::default();
//! let mem = Arc::new(MemTable::new(InternalKeyComparator::new(
//!     options.comparator.clone(),
//! )));
//!
//! // Apply a batch atomically at sequences 1..=3.
//! let mut batch = WriteBatch::new();
//! batch.put(b"apple", b"red");
//! batch.put(b"banana", b"yellow");
//! batch.delete(b"apple");
//! batch.set_sequence(1);
//! batch.insert_into(&mem).unwrap();
//!
//! // Flush the memtable into an in-memory table.
//! let mut sink = Vec::new();
//! let meta = write_table(&mut mem.iter(), &options, &mut sink).unwrap().unwrap();
//! let table = Table::open(
//!     table_options(&options),
//!     Arc::new(MemoryFile::new(sink)),
//!     meta.file_size,
//! )
//! .unwrap();
//!
//! // Read the latest state back.
//! let mut view = SnapshotIterator::new(
//!     Box::new(table.iter(ReadOptions::default())),
//!     options.comparator.clone(),
//!     3,
//! );
//! let entries = collect_entries(&mut view).unwrap();
//! assert_eq!(entries, vec![(b"banana".to_vec(), b"yellow".to_vec())]);
//! ```
//!
//! ## Components
//!
//! - [`comparator`] / [`keys`]: user-key ordering and the internal key
//!   `(user_key, sequence, type)` that every stored entry carries.
//! - [`memtable`]: concurrent-read, single-writer skip list buffering the
//!   most recent writes.
//! - [`write_batch`]: atomic groups of puts and deletes.
//! - [`table`]: the immutable sorted table format (blocks, index, filter,
//!   footer), bit-compatible with LevelDB tables.
//! - [`filter`]: Bloom filters consulted before reading a data block.
//! - [`iterator`]: the cursor contract shared by every source, plus
//!   merging, two-level and snapshot wrappers.
//! - [`flush`]: draining a memtable into a table.
//! - [`env`]: the file abstraction tables are written to and read from.

pub mod comparator;
pub mod encoding;
pub mod env;
pub mod error;
pub mod filter;
pub mod flush;
pub mod iterator;
pub mod keys;
pub mod memtable;
pub mod options;
pub mod table;
pub mod util;
pub mod write_batch;

pub use comparator::{BytewiseComparator, Comparator, ReverseComparator, bytewise_comparator};
pub use env::{FileSink, MemoryFile, MmapFile, RandomAccessFile, WritableFile};
pub use error::{Error, Result};
pub use filter::{BloomFilterPolicy, FilterPolicy};
pub use iterator::StorageIterator;
pub use keys::{SequenceNumber, ValueType};
pub use memtable::MemTable;
pub use options::{CompressionType, Options, ReadOptions};
pub use table::{Table, TableBuilder};
pub use write_batch::WriteBatch;
