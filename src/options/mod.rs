//! Build- and read-time configuration.
//!
//! [`Options`] carries everything that shapes how tables and memtables are
//! built: the key order, block geometry, compression and filtering. All
//! fields are public and have defaults via [`Options::default()`];
//! [`Options::validate`] is run by the table builder and reader.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lsmcore::{BloomFilterPolicy, CompressionType, Options};
//!
//! let options = Options {
//!     block_size: 16 * 1024,
//!     compression: CompressionType::None,
//!     filter_policy: Some(Arc::new(BloomFilterPolicy::new(10))),
//!     ..Options::default()
//! };
//! assert!(options.validate().is_ok());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::comparator::{Comparator, bytewise_comparator};
use crate::error::{Error, Result};
use crate::filter::{FILTER_BASE_LG, FilterPolicy};


/// Codec applied to data, index and metaindex blocks.
///
/// The discriminant is persisted in every block trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompressionType {
    /// Stored as-is.
    None = 0,
    /// Snappy raw format.
    #[default]
    Snappy = 1,
}

impl TryFrom<u8> for CompressionType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Snappy),
            other => Err(Error::corruption(format!("bad block type {other}"))),
        }
    }
}

/// Options controlling table and memtable construction.
#[derive(Clone)]
pub struct Options {
    /// Order of keys in every block, table and memtable built with these
    /// options. Tables must be read with the comparator they were built
    /// with.
    ///
    /// Default: bytewise.
    pub comparator: Arc<dyn Comparator>,

    /// Approximate size of uncompressed user data packed per data block.
    ///
    /// Default: 4 KiB. Must be > 0.
    pub block_size: usize,

    /// Number of keys between restart points in data blocks.
    ///
    /// Default: 16. Must be > 0.
    pub block_restart_interval: usize,

    /// Block compression. Blocks that do not shrink by at least 12.5% are
    /// stored uncompressed regardless.
    ///
    /// Default: [`CompressionType::Snappy`].
    pub compression: CompressionType,

    /// Optional filter consulted before reading a data block on point
    /// lookups.
    ///
    /// Default: none.
    pub filter_policy: Option<Arc<dyn FilterPolicy>>,

    /// Log2 of the data-offset range covered by one filter.
    ///
    /// Default: 11 (2 KiB). Must be in `1..=30`.
    pub filter_base_lg: u8,

    /// Memtable size at which it should be flushed to a table.
    ///
    /// Default: 4 MiB. Must be >= 1024.
    pub write_buffer_size: usize,

    /// Treat a malformed filter meta block as an open error instead of
    /// silently reading without a filter.
    ///
    /// Default: false.
    pub paranoid_checks: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            comparator: bytewise_comparator(),
            block_size: 4 * 1024,
            block_restart_interval: 16,
            compression: CompressionType::default(),
            filter_policy: None,
            filter_base_lg: FILTER_BASE_LG,
            write_buffer_size: 4 * 1024 * 1024,
            paranoid_checks: false,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("comparator", &self.comparator.name())
            .field("block_size", &self.block_size)
            .field("block_restart_interval", &self.block_restart_interval)
            .field("compression", &self.compression)
            .field(
                "filter_policy",
                &self.filter_policy.as_ref().map(|p| p.name().to_string()),
            )
            .field("filter_base_lg", &self.filter_base_lg)
            .field("write_buffer_size", &self.write_buffer_size)
            .field("paranoid_checks", &self.paranoid_checks)
            .finish()
    }
}

impl Options {
    /// Validates all configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid_argument("block_size must be > 0"));
        }
        if self.block_restart_interval == 0 {
            return Err(Error::invalid_argument(
                "block_restart_interval must be > 0",
            ));
        }
        if !(1..=30).contains(&self.filter_base_lg) {
            return Err(Error::invalid_argument(
                "filter_base_lg must be in 1..=30",
            ));
        }
        if self.write_buffer_size < 1024 {
            return Err(Error::invalid_argument(
                "write_buffer_size must be >= 1024",
            ));
        }
        Ok(())
    }
}

/// Options for individual reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Verify data-block checksums. Index and metaindex blocks are always
    /// verified.
    ///
    /// Default: false.
    pub verify_checksums: bool,
}
