//! Real-file backing store
//!
//! Used when the dispatcher runs in a context with direct filesystem
//! access. Relative logical paths resolve against a fixed root; reads and
//! writes seek to the absolute offset first, so there is no append
//! positioning anywhere. Handles map descriptors to open native files
//! and are torn down explicitly by `close`.

use super::{is_sidecar, BackingStore, FileTable, OpenMode, SIDECAR_SUFFIXES};
use crate::config::VfsConfig;
use crate::error::{Result, VfsError};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

struct DiskFile {
    path: PathBuf,
    file: File,
}

/// Backing store over real files beneath a root directory.
pub struct DiskStore {
    root: PathBuf,
    files: FileTable<DiskFile>,
}

impl DiskStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DiskStore { root: root.into(), files: FileTable::new() }
    }

    pub fn from_config(config: &VfsConfig) -> Self {
        Self::new(config.root_dir.clone())
    }

    /// Resolve a logical path: absolute paths pass through, relative
    /// paths land under the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Remove stale nonzero-length sidecars of a primary that is about to
    /// be created fresh. A leftover `-wal`/`-shm` next to a brand-new
    /// primary corrupts the engine's recovery path.
    fn purge_stale_sidecars(&self, primary: &Path) {
        for suffix in SIDECAR_SUFFIXES {
            let mut sidecar = primary.as_os_str().to_os_string();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            match std::fs::metadata(&sidecar) {
                Ok(meta) if meta.is_file() && meta.len() > 0 => {
                    warn!(path = %sidecar.display(), "removing stale sidecar");
                    if let Err(e) = std::fs::remove_file(&sidecar) {
                        warn!(path = %sidecar.display(), error = %e, "sidecar removal failed");
                    }
                }
                _ => {}
            }
        }
    }
}

impl BackingStore for DiskStore {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<i32> {
        let resolved = self.resolve(path);

        let fresh = mode.allows_create() && !is_sidecar(path) && !resolved.exists();
        if fresh || (mode.truncate && !is_sidecar(path)) {
            self.purge_stale_sidecars(&resolved);
        }

        let file = OpenOptions::new()
            .read(true)
            // Creation needs a writable descriptor even for create-only modes.
            .write(mode.write || mode.create)
            .create(mode.allows_create())
            .truncate(mode.truncate)
            .open(&resolved)
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    VfsError::NotFound(path.to_string())
                } else {
                    VfsError::Io(e)
                }
            })?;

        let fd = self.files.insert(DiskFile { path: resolved.clone(), file });
        debug!(path = %resolved.display(), fd, "disk open");
        Ok(fd)
    }

    fn close(&mut self, fd: i32) -> Result<()> {
        let entry = self.files.remove(fd)?;
        debug!(path = %entry.path.display(), fd, "disk close");
        Ok(())
    }

    fn pread(&mut self, fd: i32, buf: &mut [u8], offset: u64) -> Result<usize> {
        let entry = self.files.get_mut(fd)?;
        entry.file.seek(SeekFrom::Start(offset))?;

        // Loop to completion; a single read may come back short well
        // before end-of-file.
        let mut done = 0;
        while done < buf.len() {
            let n = entry.file.read(&mut buf[done..])?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }

    fn pwrite(&mut self, fd: i32, data: &[u8], offset: u64) -> Result<usize> {
        let entry = self.files.get_mut(fd)?;
        entry.file.seek(SeekFrom::Start(offset))?;
        entry.file.write_all(data)?;
        Ok(data.len())
    }

    fn size(&mut self, fd: i32) -> Result<u64> {
        let entry = self.files.get(fd)?;
        Ok(entry.file.metadata()?.len())
    }

    fn sync(&mut self, fd: i32) -> Result<()> {
        let entry = self.files.get(fd)?;
        entry.file.sync_all()?;
        Ok(())
    }
}
