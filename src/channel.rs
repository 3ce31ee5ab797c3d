//! Status channel and transfer buffer
//!
//! The only two resources shared between the requester and the executor.
//! The status channel is the fixed 12-byte completion record (ready flag,
//! result value, success flag at offsets 0/4/8); the transfer buffer is
//! the fixed-capacity payload region. Both are single-slot: one in-flight
//! request at a time.

use crate::error::{Result, VfsError};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicI32, Ordering};

/// Completion record for one bridged operation.
///
/// The executor publishes the result slots strictly before flipping the
/// ready flag; the requester's blocking wait cannot observe ready=1
/// before those writes are visible.
pub struct StatusChannel {
    ready: AtomicI32,
    value: AtomicI32,
    ok: AtomicI32,
    lock: Mutex<()>,
    cond: Condvar,
}

impl StatusChannel {
    pub fn new() -> Self {
        StatusChannel {
            ready: AtomicI32::new(0),
            value: AtomicI32::new(0),
            ok: AtomicI32::new(0),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Clear the ready flag. The requester calls this before issuing the
    /// next request.
    pub fn reset(&self) {
        self.ready.store(0, Ordering::Release);
    }

    /// Publish a result and release the blocked requester.
    ///
    /// The result slots are ordered before the ready flip by the release
    /// store; the notify runs under the lock so a requester entering the
    /// wait between the flag check and the sleep cannot miss it.
    pub fn signal(&self, value: i32, ok: bool) {
        self.value.store(value, Ordering::Relaxed);
        self.ok.store(ok as i32, Ordering::Relaxed);
        let _guard = self.lock.lock();
        self.ready.store(1, Ordering::Release);
        self.cond.notify_one();
    }

    /// Block until the ready flag is 1, then return (value, success).
    ///
    /// No timeout: a dispatcher that dies before signaling hangs the
    /// caller, which is the documented tradeoff of this design.
    pub fn wait_ready(&self) -> (i32, bool) {
        if self.ready.load(Ordering::Acquire) == 0 {
            let mut guard = self.lock.lock();
            while self.ready.load(Ordering::Acquire) == 0 {
                self.cond.wait(&mut guard);
            }
        }
        (
            self.value.load(Ordering::Relaxed),
            self.ok.load(Ordering::Relaxed) == 1,
        )
    }

    /// Nonblocking view of the ready flag.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) == 1
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity payload region shared by requester and executor.
///
/// Read results and write payloads travel through here rather than
/// through the request envelope. A payload larger than the capacity
/// fails the request; the protocol has no chunked transfer.
pub struct TransferBuffer {
    data: Mutex<Box<[u8]>>,
    capacity: usize,
}

impl TransferBuffer {
    pub fn new(capacity: usize) -> Self {
        TransferBuffer {
            data: Mutex::new(vec![0u8; capacity].into_boxed_slice()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check(&self, len: usize) -> Result<()> {
        if len > self.capacity {
            return Err(VfsError::Capacity { len, capacity: self.capacity });
        }
        Ok(())
    }

    /// Copy a payload into the buffer (requester side of a write).
    pub fn stage(&self, src: &[u8]) -> Result<()> {
        self.check(src.len())?;
        self.data.lock()[..src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Fill up to `len` bytes in place (executor side of a read).
    ///
    /// The closure receives the writable prefix and returns how many
    /// bytes it produced.
    pub fn stage_with<F>(&self, len: usize, fill: F) -> Result<usize>
    where
        F: FnOnce(&mut [u8]) -> Result<usize>,
    {
        self.check(len)?;
        let mut guard = self.data.lock();
        fill(&mut guard[..len])
    }

    /// Borrow the first `len` bytes (executor side of a write).
    pub fn consume_with<F, R>(&self, len: usize, f: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> Result<R>,
    {
        self.check(len)?;
        let guard = self.data.lock();
        f(&guard[..len])
    }

    /// Copy the first `dst.len()` bytes out (requester side of a read).
    pub fn read_into(&self, dst: &mut [u8]) -> Result<()> {
        self.check(dst.len())?;
        dst.copy_from_slice(&self.data.lock()[..dst.len()]);
        Ok(())
    }
}
