//! Minimal I/O surface the storage core depends on.
//!
//! Tables are written through a [`WritableFile`] (sequential append) and
//! read back through a [`RandomAccessFile`] (positional reads). Two
//! families of implementations are provided:
//!
//! - In memory: `Vec<u8>` as a sink and [`MemoryFile`] as a source. Used by
//!   tests and by callers that stage tables before persisting them.
//! - On disk: [`FileSink`] (buffered writer with `fsync` on
//!   [`sync`](WritableFile::sync)) and [`MmapFile`] (read-only memory map).


use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Error, Result};

// ------------------------------------------------------------------------------------------------
// Traits
// ------------------------------------------------------------------------------------------------

/// Sequential, append-only output.
pub trait WritableFile: Send {
    /// Appends `data` at the end of the file.
    fn append(&mut self, data: &[u8]) -> Result<()>;

    /// Pushes buffered data to the operating system.
    fn flush(&mut self) -> Result<()>;

    /// Makes appended data durable.
    fn sync(&mut self) -> Result<()>;

    /// Flushes and releases the file. Further appends are errors.
    fn close(&mut self) -> Result<()>;
}

/// Positional reads from immutable content.
pub trait RandomAccessFile: Send + Sync {
    /// Reads up to `n` bytes starting at `offset`.
    ///
    /// Returns fewer than `n` bytes only when the read crosses the end of
    /// the file. An `offset` past the end is [`Error::InvalidArgument`].
    fn read(&self, offset: u64, n: usize) -> Result<Vec<u8>>;

    /// Total size in bytes.
    fn size(&self) -> u64;
}

impl<W: WritableFile + ?Sized> WritableFile for &mut W {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        (**self).append(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Shared bounds logic for in-memory sources.
fn read_slice(data: &[u8], offset: u64, n: usize) -> Result<Vec<u8>> {
    let len = data.len() as u64;
    if offset > len {
        return Err(Error::invalid_argument(format!(
            "read offset {offset} beyond file size {len}"
        )));
    }
    let start = offset as usize;
    let end = start.saturating_add(n).min(data.len());
    Ok(data[start..end].to_vec())
}

// ------------------------------------------------------------------------------------------------
// In-memory implementations
// ------------------------------------------------------------------------------------------------

/// Growable in-memory sink. The inherent `Vec::append` shadows
/// [`WritableFile::append`], so call it as `WritableFile::append(&mut v, data)`
/// or through a `&mut dyn WritableFile`.
impl WritableFile for Vec<u8> {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Immutable in-memory file contents.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Arc<[u8]>,
}

impl MemoryFile {
    /// Wraps `data`.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// The full contents.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl RandomAccessFile for MemoryFile {
    fn read(&self, offset: u64, n: usize) -> Result<Vec<u8>> {
        read_slice(&self.data, offset, n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// ------------------------------------------------------------------------------------------------
// File-backed implementations
// ------------------------------------------------------------------------------------------------

/// Buffered writer over a newly created file.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Path the sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::invalid_argument(format!("{} is closed", self.path.display())))
    }
}

impl WritableFile for FileSink {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.writer()?.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        let writer = self.writer()?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(path = %self.path.display(), "file sink closed");
        }
        Ok(())
    }
}

/// Read-only memory map of an existing file.
pub struct MmapFile {
    path: PathBuf,
    /// `None` for zero-length files, which cannot be mapped.
    mmap: Option<Mmap>,
}

impl MmapFile {
    /// Maps the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: table files are never modified after they are
            // finished, so the mapping is not mutated underneath us.
            Some(unsafe { Mmap::map(&file)? })
        };
        debug!(path = %path.display(), len, "file mapped");
        Ok(Self { path, mmap })
    }

    /// Path of the mapped file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl RandomAccessFile for MmapFile {
    fn read(&self, offset: u64, n: usize) -> Result<Vec<u8>> {
        read_slice(self.bytes(), offset, n)
    }

    fn size(&self) -> u64 {
        self.bytes().len() as u64
    }
}
