use crate::error::{Error, Result};
use crate::iterator::{EmptyIterator, StorageIterator};

/// Opens the data iterator for an index entry's value.
pub type BlockFunction = Box<dyn Fn(&[u8]) -> Result<Box<dyn StorageIterator>> + Send>;

/// Iterates the concatenation of the data iterators named by an index
/// iterator.
///
/// The index iterator's values (block handles for tables) are handed to the
/// block function whenever the outer cursor lands on a different entry.
/// Empty data blocks are skipped in both directions. A failing block
/// function yields an empty data iterator whose error surfaces through
/// [`status`](StorageIterator::status).
pub struct TwoLevelIterator {
    index_iter: Box<dyn StorageIterator>,
    block_function: BlockFunction,
    data_iter: Option<Box<dyn StorageIterator>>,
    /// Index value `data_iter` was opened from.
    data_block_handle: Vec<u8>,
    /// First error from a discarded data iterator.
    status: Option<Error>,
}

impl TwoLevelIterator {
    /// Builds the iterator; it starts unpositioned.
    pub fn new(index_iter: Box<dyn StorageIterator>, block_function: BlockFunction) -> Self {
        Self {
            index_iter,
            block_function,
            data_iter: None,
            data_block_handle: Vec::new(),
            status: None,
        }
    }

    fn save_error(&mut self, result: Result<()>) {
        if self.status.is_none() {
            if let Err(e) = result {
                self.status = Some(e);
            }
        }
    }

    fn set_data_iter(&mut self, data_iter: Option<Box<dyn StorageIterator>>) {
        if let Some(old) = self.data_iter.take() {
            self.save_error(old.status());
        }
        self.data_iter = data_iter;
    }

    fn init_data_block(&mut self) {
        if !self.index_iter.valid() {
            self.set_data_iter(None);
            return;
        }

        let handle = self.index_iter.value();
        if self.data_iter.is_some() && handle == self.data_block_handle.as_slice() {
            // Already positioned on this block.
            return;
        }

        let handle = handle.to_vec();
        let iter = (self.block_function)(&handle)
            .unwrap_or_else(|e| Box::new(EmptyIterator::with_error(e)));
        self.data_block_handle = handle;
        self.set_data_iter(Some(iter));
    }

    fn data_valid(&self) -> bool {
        self.data_iter.as_ref().is_some_and(|it| it.valid())
    }

    fn skip_empty_data_blocks_forward(&mut self) {
        while !self.data_valid() {
            if !self.index_iter.valid() {
                self.set_data_iter(None);
                return;
            }
            self.index_iter.next();
            self.init_data_block();
            if let Some(it) = self.data_iter.as_mut() {
                it.seek_to_first();
            }
        }
    }

    fn skip_empty_data_blocks_backward(&mut self) {
        while !self.data_valid() {
            if !self.index_iter.valid() {
                self.set_data_iter(None);
                return;
            }
            self.index_iter.prev();
            self.init_data_block();
            if let Some(it) = self.data_iter.as_mut() {
                it.seek_to_last();
            }
        }
    }
}

impl StorageIterator for TwoLevelIterator {
    fn valid(&self) -> bool {
        self.data_valid()
    }

    fn seek_to_first(&mut self) {
        self.index_iter.seek_to_first();
        self.init_data_block();
        if let Some(it) = self.data_iter.as_mut() {
            it.seek_to_first();
        }
        self.skip_empty_data_blocks_forward();
    }

    fn seek_to_last(&mut self) {
        self.index_iter.seek_to_last();
        self.init_data_block();
        if let Some(it) = self.data_iter.as_mut() {
            it.seek_to_last();
        }
        self.skip_empty_data_blocks_backward();
    }

    fn seek(&mut self, target: &[u8]) {
        self.index_iter.seek(target);
        self.init_data_block();
        if let Some(it) = self.data_iter.as_mut() {
            it.seek(target);
        }
        self.skip_empty_data_blocks_forward();
    }

    fn next(&mut self) {
        if let Some(it) = self.data_iter.as_mut() {
            it.next();
        }
        self.skip_empty_data_blocks_forward();
    }

    fn prev(&mut self) {
        if let Some(it) = self.data_iter.as_mut() {
            it.prev();
        }
        self.skip_empty_data_blocks_backward();
    }

    fn key(&self) -> &[u8] {
        match &self.data_iter {
            Some(it) => it.key(),
            None => &[],
        }
    }

    fn value(&self) -> &[u8] {
        match &self.data_iter {
            Some(it) => it.value(),
            None => &[],
        }
    }

    fn status(&self) -> Result<()> {
        self.index_iter.status()?;
        if let Some(it) = &self.data_iter {
            it.status()?;
        }
        match &self.status {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
