//! Key-value backed persistent store
//!
//! Buffer semantics identical to the in-memory store, plus durability:
//! file content is fetched from a key-value store at open, mutated in
//! memory with dirty tracking, and flushed back whole on `sync` and on
//! `close`. A brand-new primary database file is synthesized as a single
//! valid header page so the consuming engine accepts it on first read;
//! stale sidecar entries are purged before the primary is created fresh.
//!
//! No cross-process transactional isolation: a fetch that races a
//! concurrent flush may observe either value.

use super::memory::{read_at, write_at};
use super::{is_sidecar, BackingStore, FileTable, OpenMode, SIDECAR_SUFFIXES};
use crate::config::VfsConfig;
use crate::error::{Result, VfsError};
use crate::header::{has_magic, initial_database_page};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// The external key-value collaborator.
///
/// An opaque byte store over namespaced string keys. Implementations take
/// `&self`; a real client is typically shared and internally
/// synchronized.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the value under `key`.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-process key-value store for tests and ephemeral deployments.
#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<Mutex<AHashMap<String, Vec<u8>>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.lock().remove(key);
        Ok(())
    }
}

struct KvFile {
    path: String,
    key: String,
    data: Vec<u8>,
    dirty: bool,
}

/// Backing store that keeps whole files as key-value entries.
pub struct KvStore<K: KeyValueStore> {
    kv: K,
    key_prefix: String,
    files: FileTable<KvFile>,
}

impl<K: KeyValueStore> KvStore<K> {
    pub fn new(kv: K) -> Self {
        Self::with_config(kv, &VfsConfig::default())
    }

    pub fn with_config(kv: K, config: &VfsConfig) -> Self {
        KvStore {
            kv,
            key_prefix: config.key_prefix.clone(),
            files: FileTable::new(),
        }
    }

    fn key_for(&self, path: &str) -> String {
        format!("{}{}", self.key_prefix, path)
    }

    /// Delete nonzero-length sidecar entries of a primary about to be
    /// created fresh. Zero-length entries are harmless and stay.
    fn purge_stale_sidecars(&self, path: &str) -> Result<()> {
        for suffix in SIDECAR_SUFFIXES {
            let key = self.key_for(&format!("{}{}", path, suffix));
            if let Some(value) = self.kv.get(&key)? {
                if !value.is_empty() {
                    warn!(key = %key, "purging stale sidecar entry");
                    self.kv.delete(&key)?;
                }
            }
        }
        Ok(())
    }

    fn flush(kv: &K, file: &mut KvFile) -> Result<()> {
        if file.dirty {
            kv.put(&file.key, &file.data)?;
            file.dirty = false;
            debug!(path = %file.path, bytes = file.data.len(), "kv flush");
        }
        Ok(())
    }
}

impl<K: KeyValueStore> BackingStore for KvStore<K> {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<i32> {
        let key = self.key_for(path);

        let data = match self.kv.get(&key)? {
            Some(existing) => {
                // Advisory format check only; a mismatch is logged,
                // not fatal.
                if !is_sidecar(path) && !existing.is_empty() && !has_magic(&existing) {
                    warn!(path, "existing primary lacks the database magic string");
                }
                existing
            }
            None => {
                if !mode.allows_create() {
                    return Err(VfsError::NotFound(path.to_string()));
                }
                let initial = if is_sidecar(path) {
                    Vec::new()
                } else {
                    self.purge_stale_sidecars(path)?;
                    initial_database_page()
                };
                self.kv.put(&key, &initial)?;
                initial
            }
        };

        let fd = self
            .files
            .insert(KvFile { path: path.to_string(), key, data, dirty: false });
        debug!(path, fd, "kv open");
        Ok(fd)
    }

    fn close(&mut self, fd: i32) -> Result<()> {
        // Flush first; on failure the handle stays open so the caller
        // can retry or accept the loss explicitly.
        Self::flush(&self.kv, self.files.get_mut(fd)?)?;
        let file = self.files.remove(fd)?;
        debug!(path = %file.path, fd, "kv close");
        Ok(())
    }

    fn pread(&mut self, fd: i32, buf: &mut [u8], offset: u64) -> Result<usize> {
        let file = self.files.get(fd)?;
        Ok(read_at(&file.data, buf, offset))
    }

    fn pwrite(&mut self, fd: i32, data: &[u8], offset: u64) -> Result<usize> {
        let file = self.files.get_mut(fd)?;
        let n = write_at(&mut file.data, data, offset)?;
        file.dirty = true;
        Ok(n)
    }

    fn size(&mut self, fd: i32) -> Result<u64> {
        Ok(self.files.get(fd)?.data.len() as u64)
    }

    fn sync(&mut self, fd: i32) -> Result<()> {
        Self::flush(&self.kv, self.files.get_mut(fd)?)
    }
}
