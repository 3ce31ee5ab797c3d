//! Synchronous façade over a dispatcher running in another thread
//!
//! The engine cannot suspend, so each call blocks the calling thread:
//! reset the ready flag, serialize the envelope, post it to the
//! dispatcher's context, wait on the status channel, decode the slots.
//! Message passing carries the request; shared memory carries the
//! completion signal and the bulk payload, never the reverse.
//!
//! One outstanding request at a time is a hard rule of the channel, and
//! it is enforced structurally: every operation takes `&mut self` and
//! the bridge is not clonable, so a second request cannot start before
//! the first returns.

use crate::channel::{StatusChannel, TransferBuffer};
use crate::config::VfsConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, VfsError};
use crate::protocol::Request;
use crate::store::{BackingStore, OpenMode};
use crossbeam::channel::{unbounded, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// Blocking bridge to a backing store owned by a dispatcher thread.
///
/// Implements [`BackingStore`] itself, so callers drive it exactly like
/// the in-process stores.
pub struct SyncBridge {
    requests: Option<Sender<Vec<u8>>>,
    status: Arc<StatusChannel>,
    transfer: Arc<TransferBuffer>,
    worker: Option<JoinHandle<()>>,
}

impl SyncBridge {
    /// Move `store` onto a dispatcher thread and return the façade.
    pub fn spawn(store: Box<dyn BackingStore>) -> Self {
        Self::spawn_with_config(store, &VfsConfig::default())
    }

    pub fn spawn_with_config(store: Box<dyn BackingStore>, config: &VfsConfig) -> Self {
        let status = Arc::new(StatusChannel::new());
        let transfer = Arc::new(TransferBuffer::new(config.transfer_capacity));
        let (tx, rx) = unbounded();

        let dispatcher =
            Dispatcher::new(store, Arc::clone(&status), Arc::clone(&transfer), rx);
        let worker = std::thread::Builder::new()
            .name("relayfs-dispatcher".into())
            .spawn(move || dispatcher.run())
            .expect("failed to spawn dispatcher thread");

        debug!(capacity = config.transfer_capacity, "bridge up");
        SyncBridge {
            requests: Some(tx),
            status,
            transfer,
            worker: Some(worker),
        }
    }

    /// Capacity of the payload transfer buffer.
    pub fn transfer_capacity(&self) -> usize {
        self.transfer.capacity()
    }

    /// Issue one request and block until the dispatcher signals.
    ///
    /// On success returns slot 1 (fd or byte count); on failure rebuilds
    /// the error from the negated code. No timeout: if the dispatcher
    /// dies mid-request the caller hangs, the documented tradeoff. Death
    /// detectable at send time surfaces as an error instead.
    fn call(&mut self, request: Request) -> Result<i32> {
        let envelope = request.encode()?;
        self.status.reset();

        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| VfsError::Disconnected("bridge is shut down".into()))?;
        sender
            .send(envelope)
            .map_err(|_| VfsError::Disconnected("dispatcher channel closed".into()))?;

        let (value, ok) = self.status.wait_ready();
        if ok {
            Ok(value)
        } else {
            Err(VfsError::from_code(-value))
        }
    }
}

impl BackingStore for SyncBridge {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<i32> {
        self.call(Request::Open { path: path.to_string(), flags: mode.encode() })
    }

    fn close(&mut self, fd: i32) -> Result<()> {
        self.call(Request::Close { fd })?;
        Ok(())
    }

    fn pread(&mut self, fd: i32, buf: &mut [u8], offset: u64) -> Result<usize> {
        let n = self.call(Request::Read { fd, offset, size: buf.len() })? as usize;
        // Payload was staged before the signal; copy it out before the
        // buffer can be reused by the next request.
        self.transfer.read_into(&mut buf[..n])?;
        Ok(n)
    }

    fn pwrite(&mut self, fd: i32, data: &[u8], offset: u64) -> Result<usize> {
        self.transfer.stage(data)?;
        let n = self.call(Request::Write { fd, offset, size: data.len() })?;
        Ok(n as usize)
    }

    fn size(&mut self, fd: i32) -> Result<u64> {
        Ok(self.call(Request::Size { fd })? as u64)
    }

    fn sync(&mut self, fd: i32) -> Result<()> {
        self.call(Request::Sync { fd })?;
        Ok(())
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        // Closing the channel ends the dispatcher loop; join so the
        // store's teardown (flushes on close) finishes before we return.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
