use std::cell::OnceCell;

use tracing::warn;

use crate::error::{Error, Result};
use crate::iterator::StorageIterator;
use crate::keys::{InternalKey, MAX_SEQUENCE_NUMBER, ParsedInternalKey, VALUE_TYPE_FOR_SEEK};
use crate::util::EscapedBytes;

/// Placeholder returned by [`UserKeyIterator::key`] for unparsable keys.
const CORRUPTED_KEY: &[u8] = b"corrupted key";

/// Exposes an internal-key iterator in terms of user keys.
///
/// Every version of a user key is still visible; use
/// [`SnapshotIterator`](crate::iterator::SnapshotIterator) for the
/// deduplicated view. A key that fails to parse is returned as a fixed
/// placeholder and recorded as a corruption in `status()`.
pub struct UserKeyIterator {
    inner: Box<dyn StorageIterator>,
    corruption: OnceCell<Error>,
}

impl UserKeyIterator {
    /// Wraps an iterator over internal keys.
    pub fn new(inner: Box<dyn StorageIterator>) -> Self {
        Self {
            inner,
            corruption: OnceCell::new(),
        }
    }
}

impl StorageIterator for UserKeyIterator {
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn seek_to_first(&mut self) {
        self.inner.seek_to_first();
    }

    fn seek_to_last(&mut self) {
        self.inner.seek_to_last();
    }

    /// Seeks to the newest version of `target`.
    fn seek(&mut self, target: &[u8]) {
        let key = InternalKey::new(target, MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK);
        self.inner.seek(key.encode());
    }

    fn next(&mut self) {
        self.inner.next();
    }

    fn prev(&mut self) {
        self.inner.prev();
    }

    fn key(&self) -> &[u8] {
        let raw = self.inner.key();
        match ParsedInternalKey::parse(raw) {
            Ok(parsed) => parsed.user_key,
            Err(e) => {
                if self.corruption.get().is_none() {
                    warn!(key = %EscapedBytes(raw), %e, "malformed internal key");
                    let _ = self
                        .corruption
                        .set(Error::corruption(format!("malformed internal key: {e}")));
                }
                CORRUPTED_KEY
            }
        }
    }

    fn value(&self) -> &[u8] {
        self.inner.value()
    }

    fn status(&self) -> Result<()> {
        match self.corruption.get() {
            Some(e) => Err(e.clone()),
            None => self.inner.status(),
        }
    }
}
