//! In-memory backing store
//!
//! A mapping from descriptor to an owned growable byte buffer. Nothing
//! persists beyond the store's lifetime; `sync` has no durability target
//! and is a no-op. Suitable for ephemeral databases and tests, not for
//! the persistent product path.

use super::{BackingStore, FileTable, OpenMode};
use crate::error::{Result, VfsError};
use tracing::debug;

/// Offset-clamped read shared by the buffered stores.
///
/// Never reads past `data.len()`; at or past end-of-file the result is
/// zero-length, not an error.
pub(crate) fn read_at(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
    if offset >= data.len() as u64 {
        return 0;
    }
    let offset = offset as usize;
    let n = buf.len().min(data.len() - offset);
    buf[..n].copy_from_slice(&data[offset..offset + n]);
    n
}

/// Grow-and-write shared by the buffered stores.
///
/// Extends the buffer to `max(len, offset + src.len())`, zero-filling any
/// gap before the written span. Buffers never shrink.
pub(crate) fn write_at(data: &mut Vec<u8>, src: &[u8], offset: u64) -> Result<usize> {
    let end = offset
        .checked_add(src.len() as u64)
        .ok_or_else(|| VfsError::Storage("write extends past addressable range".into()))?;
    let end = usize::try_from(end)
        .map_err(|_| VfsError::Storage("write extends past addressable range".into()))?;
    if end > data.len() {
        data.resize(end, 0);
    }
    data[end - src.len()..end].copy_from_slice(src);
    Ok(src.len())
}

struct MemFile {
    path: String,
    data: Vec<u8>,
}

/// Backing store over per-descriptor in-memory buffers.
pub struct MemoryStore {
    files: FileTable<MemFile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore { files: FileTable::new() }
    }

    /// Number of currently open handles.
    pub fn open_handles(&self) -> usize {
        self.files.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for MemoryStore {
    fn open(&mut self, path: &str, _mode: OpenMode) -> Result<i32> {
        // Every open starts from an empty buffer; this store has no
        // pre-existing storage to fetch from.
        let fd = self.files.insert(MemFile { path: path.to_string(), data: Vec::new() });
        debug!(path, fd, "memory open");
        Ok(fd)
    }

    fn close(&mut self, fd: i32) -> Result<()> {
        let file = self.files.remove(fd)?;
        debug!(path = %file.path, fd, "memory close");
        Ok(())
    }

    fn pread(&mut self, fd: i32, buf: &mut [u8], offset: u64) -> Result<usize> {
        let file = self.files.get(fd)?;
        Ok(read_at(&file.data, buf, offset))
    }

    fn pwrite(&mut self, fd: i32, data: &[u8], offset: u64) -> Result<usize> {
        let file = self.files.get_mut(fd)?;
        write_at(&mut file.data, data, offset)
    }

    fn size(&mut self, fd: i32) -> Result<u64> {
        Ok(self.files.get(fd)?.data.len() as u64)
    }

    fn sync(&mut self, fd: i32) -> Result<()> {
        // No durability target; still validates the descriptor.
        self.files.get(fd)?;
        Ok(())
    }
}
