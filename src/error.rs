//! Crate-wide error type.
//!
//! Every fallible operation in the storage core reports one of four
//! outcomes besides success:
//!
//! - [`Error::NotFound`]: a lookup found no qualifying entry.
//! - [`Error::Corruption`]: persisted or encoded bytes failed validation
//!   (bad checksum, bad magic, malformed internal key, batch count mismatch).
//! - [`Error::InvalidArgument`]: a caller-supplied parameter is out of range.
//! - [`Error::Io`]: opaque pass-through from the I/O layer.
//!
//! The type is `Clone` so that iterators can keep a deferred status and
//! report it from [`status()`](crate::iterator::StorageIterator::status)
//! any number of times.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::encoding::EncodingError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the storage core.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No entry matched the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored or encoded data is malformed.
    #[error("corruption: {0}")]
    Corruption(String),

    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error bubbled up from the I/O layer.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl Error {
    /// Shorthand for building a [`Error::Corruption`].
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Shorthand for building a [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Returns `true` for [`Error::Corruption`].
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }

    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns `true` for [`Error::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<EncodingError> for Error {
    fn from(e: EncodingError) -> Self {
        Error::Corruption(e.to_string())
    }
}
