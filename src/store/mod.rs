//! Backing store abstraction
//!
//! Three implementations share one contract: real files on disk
//! ([`DiskStore`]), growable in-memory buffers ([`MemoryStore`]), and a
//! key-value store with lazy header synthesis ([`KvStore`]). The variant
//! is chosen at construction time; callers only see [`BackingStore`].

pub mod disk;
pub mod kv;
pub mod memory;

pub use disk::DiskStore;
pub use kv::{KeyValueStore, KvStore, MemoryKv};
pub use memory::MemoryStore;

use crate::error::{Result, VfsError};
use ahash::AHashMap;

/// First descriptor handed out. 0/1/2 stay reserved for the standard
/// streams and are never assigned to files.
pub const FIRST_FD: i32 = 3;

/// Suffixes of sidecar files logically owned by a primary database file.
pub const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// True for write-ahead-log and shared-memory sidecar paths.
pub fn is_sidecar(path: &str) -> bool {
    SIDECAR_SUFFIXES.iter().any(|s| path.ends_with(s))
}

/// The six synchronous operations the engine drives.
///
/// All implementations share the same external semantics: offset-addressed
/// reads and writes, short reads past end-of-file, content that only ever
/// grows. Methods take `&mut self`: a store serves a single logical
/// caller, and integrators that share one add their own serialization.
pub trait BackingStore: Send {
    /// Open or create a file, returning its descriptor.
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<i32>;

    /// Flush if needed and invalidate the descriptor.
    fn close(&mut self, fd: i32) -> Result<()>;

    /// Read up to `buf.len()` bytes at `offset`. Reads past end-of-file
    /// return short (possibly zero-length) results, never an error.
    fn pread(&mut self, fd: i32, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Write `data` at `offset`, growing the file as needed.
    fn pwrite(&mut self, fd: i32, data: &[u8], offset: u64) -> Result<usize>;

    /// Current file length in bytes.
    fn size(&mut self, fd: i32) -> Result<u64>;

    /// Flush to durable storage. A no-op for stores with no durability
    /// target.
    fn sync(&mut self, fd: i32) -> Result<()>;
}

/// Open disposition, parsed from a compact flag string
/// (`r`, `w`, `a`, `c`, `+`).
///
/// `a` deliberately does not map to append positioning: writes are always
/// offset-addressed, so `a` is read-write-create only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenMode {
    /// Read-only (`"r"`).
    pub fn read_only() -> Self {
        OpenMode { read: true, ..Default::default() }
    }

    /// Read-write, creating if absent (`"a+"`): the mode database
    /// engines open their files with.
    pub fn read_write() -> Self {
        OpenMode { read: true, write: true, create: true, truncate: false }
    }

    /// Parse a flag string. An empty string means read-only.
    pub fn parse(flags: &str) -> Result<Self> {
        if flags.is_empty() {
            return Ok(Self::read_only());
        }
        let mut mode = OpenMode::default();
        for ch in flags.chars() {
            match ch {
                'r' => mode.read = true,
                'w' => {
                    mode.read = true;
                    mode.write = true;
                    mode.create = true;
                    mode.truncate = true;
                }
                'a' => {
                    mode.read = true;
                    mode.write = true;
                    mode.create = true;
                }
                'c' => mode.create = true,
                '+' => {
                    mode.read = true;
                    mode.write = true;
                }
                _ => {
                    return Err(VfsError::Decode(format!(
                        "unknown flag char '{}' in \"{}\"",
                        ch, flags
                    )))
                }
            }
        }
        Ok(mode)
    }

    /// Whether an open may create a missing file.
    ///
    /// Write intent implies creation: only a pure read open of a
    /// missing path is a not-found error.
    pub fn allows_create(&self) -> bool {
        self.create || self.write
    }

    /// Canonical flag string for the request envelope.
    pub fn encode(&self) -> String {
        let mut s = String::new();
        if self.truncate {
            s.push('w');
        } else if self.create && self.write {
            s.push('a');
        } else {
            if self.read {
                s.push('r');
            }
            if self.create {
                s.push('c');
            }
            if self.write {
                s.push('+');
            }
        }
        if s.is_empty() {
            s.push('r');
        }
        s
    }
}

/// Mapping from descriptor to per-file state, with monotonic assignment.
///
/// Replaces the ambient module-global handle map: each store owns its
/// table, so nothing outside the executing context can touch it.
pub struct FileTable<T> {
    entries: AHashMap<i32, T>,
    next_fd: i32,
}

impl<T> FileTable<T> {
    pub fn new() -> Self {
        FileTable { entries: AHashMap::new(), next_fd: FIRST_FD }
    }

    /// Store an entry under a freshly assigned descriptor.
    ///
    /// Descriptors are monotonic, so an id is never reused while any
    /// handle that once held it could still be confused with a live one.
    pub fn insert(&mut self, entry: T) -> i32 {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.entries.insert(fd, entry);
        fd
    }

    pub fn get(&self, fd: i32) -> Result<&T> {
        self.entries.get(&fd).ok_or(VfsError::BadFd(fd))
    }

    pub fn get_mut(&mut self, fd: i32) -> Result<&mut T> {
        self.entries.get_mut(&fd).ok_or(VfsError::BadFd(fd))
    }

    pub fn remove(&mut self, fd: i32) -> Result<T> {
        self.entries.remove(&fd).ok_or(VfsError::BadFd(fd))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for FileTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fds_distinct_and_increasing() {
        let mut table = FileTable::new();
        let a = table.insert("a");
        let b = table.insert("b");
        assert_eq!(a, FIRST_FD);
        assert!(b > a);

        // Closing one leaves the other valid.
        table.remove(a).unwrap();
        assert_eq!(table.get(b).unwrap(), &"b");
        assert!(matches!(table.get(a), Err(VfsError::BadFd(_))));
    }

    #[test]
    fn test_closed_fd_never_reassigned_to_live_handle() {
        let mut table = FileTable::new();
        let a = table.insert(());
        table.remove(a).unwrap();
        let b = table.insert(());
        assert!(b > a);
    }

    #[test]
    fn test_open_mode_parse() {
        assert_eq!(OpenMode::parse("r").unwrap(), OpenMode::read_only());
        assert_eq!(OpenMode::parse("").unwrap(), OpenMode::read_only());
        assert_eq!(OpenMode::parse("a+").unwrap(), OpenMode::read_write());

        let w = OpenMode::parse("w").unwrap();
        assert!(w.read && w.write && w.create && w.truncate);

        let a = OpenMode::parse("a").unwrap();
        assert!(a.create && !a.truncate);
    }

    #[test]
    fn test_open_mode_unknown_char() {
        assert!(matches!(
            OpenMode::parse("rx"),
            Err(VfsError::Decode(_))
        ));
    }

    #[test]
    fn test_open_mode_encode_round_trip() {
        for mode in [
            OpenMode::read_only(),
            OpenMode::read_write(),
            OpenMode::parse("w").unwrap(),
            OpenMode::parse("r+").unwrap(),
            OpenMode::parse("c").unwrap(),
        ] {
            assert_eq!(OpenMode::parse(&mode.encode()).unwrap(), mode);
        }
    }

    #[test]
    fn test_create_permission() {
        assert!(!OpenMode::read_only().allows_create());
        assert!(OpenMode::read_write().allows_create());
        assert!(OpenMode::parse("r+").unwrap().allows_create());
        assert!(OpenMode::parse("c").unwrap().allows_create());
    }

    #[test]
    fn test_is_sidecar() {
        assert!(is_sidecar("db.bin-wal"));
        assert!(is_sidecar("db.bin-shm"));
        assert!(!is_sidecar("db.bin"));
        assert!(!is_sidecar("db-walx"));
    }
}
