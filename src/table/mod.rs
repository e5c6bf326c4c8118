//! Sorted Table Module
//!
//! Immutable on-disk sorted tables, built once by [`TableBuilder`] and read
//! by [`Table`]. Every block (data, filter, metaindex, index) is written in
//! the same framing; the layout is bit-compatible with LevelDB tables.
//!
//! # On-disk layout
//!
//! ```text
//! [data block 0][trailer]
//! ...
//! [data block N-1][trailer]
//! [filter block][trailer]          (only with a filter policy)
//! [metaindex block][trailer]       "filter.<policy name>" -> filter handle
//! [index block][trailer]           separator key -> data block handle
//! [footer: 48 bytes]
//! ```
//!
//! - **trailer**: `[compression type: u8][masked crc32 of block + type: fixed32]`.
//! - **index block**: one entry per data block. Its key is `>=` every key in
//!   that block and `<` every key in the following block.
//! - **footer**: metaindex and index handles padded to 40 bytes, then the
//!   magic number `0xdb4775248b80fb57`.
//!
//! Blocks are [`Block`]s: prefix-compressed entries with a restart array
//! (see [`BlockBuilder`]).
//!
//! # Concurrency model
//!
//! A [`Table`] is immutable once opened and is shared through `Arc`. Each
//! iterator owns its cursor state and the blocks it has loaded, so any
//! number of threads may read the same table without locking.
//!
//! # Sub-modules
//!
//! - [`format`]: block handles, footer, checksums and block I/O.

mod block;
mod block_builder;
mod builder;
pub mod format;
mod reader;

#[cfg(test)]
mod tests;

pub use block::{Block, BlockIter};
pub use block_builder::BlockBuilder;
pub use builder::TableBuilder;
pub use format::{BlockHandle, Footer};
pub use reader::Table;
