//! # relayfs - Synchronous VFS Bridge for Embedded Database Engines
//!
//! `relayfs` lets a database engine that expects synchronous, POSIX-like
//! file operations run against storage that is asynchronous or lives in a
//! different execution context. Three backing store variants share one
//! contract:
//!
//! - **Disk**: real files beneath a configured root, for executors with
//!   direct filesystem access
//! - **Memory**: growable in-process buffers, for ephemeral databases and
//!   tests
//! - **Key-value**: whole files as KV entries with dirty tracking, lazy
//!   SQLite header synthesis, and sidecar (`-wal`/`-shm`) lifecycle
//!   management
//!
//! When the store cannot execute on the caller's thread, [`SyncBridge`]
//! moves it onto a dispatcher thread and turns each call into a blocking
//! request: the envelope crosses a channel, the completion signal and the
//! payload come back through a shared status record and transfer buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use relayfs::{BackingStore, KvStore, MemoryKv, OpenMode, SyncBridge};
//!
//! # fn main() -> relayfs::Result<()> {
//! // A persistent store, bridged onto its own thread
//! let mut vfs = SyncBridge::spawn(Box::new(KvStore::new(MemoryKv::new())));
//!
//! // A fresh primary database file starts as one valid header page
//! let fd = vfs.open("app.db", OpenMode::read_write())?;
//! assert_eq!(vfs.size(fd)?, 4096);
//!
//! vfs.pwrite(fd, b"payload", 4096)?;
//! vfs.sync(fd)?;
//! vfs.close(fd)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! engine ──► SyncBridge ──envelope──► Dispatcher ──► BackingStore
//!    ▲           │                        │            disk / memory / kv
//!    │           ▼                        ▼
//!    └─── StatusChannel ◄──signal──  TransferBuffer
//! ```
//!
//! The status channel and transfer buffer are single-slot: one request in
//! flight per bridge, enforced by `&mut self` on every operation. The
//! in-process stores skip the bridge entirely; callers hold them
//! directly and pay no signaling cost.

pub mod bridge;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod header;
pub mod protocol;
pub mod store;

pub use bridge::SyncBridge;
pub use channel::{StatusChannel, TransferBuffer};
pub use config::VfsConfig;
pub use dispatcher::Dispatcher;
pub use error::{Result, VfsError};
pub use header::{DbHeader, MAGIC, PAGE_SIZE};
pub use store::{
    BackingStore, DiskStore, FileTable, KeyValueStore, KvStore, MemoryKv, MemoryStore, OpenMode,
};
