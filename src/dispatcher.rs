//! Command dispatcher
//!
//! Runs on the executor side of the boundary, owning the backing store
//! and the executor ends of the status channel and transfer buffer. Each
//! request moves through decode → execute → encode-result → signal and
//! terminates there; every failure, including an undecodable envelope,
//! is reported through the signaling path so the blocked requester is
//! always released.

use crate::channel::{StatusChannel, TransferBuffer};
use crate::error::Result;
use crate::protocol::{Reply, Request};
use crate::store::{BackingStore, OpenMode};
use crossbeam::channel::Receiver;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Dispatcher {
    store: Box<dyn BackingStore>,
    status: Arc<StatusChannel>,
    transfer: Arc<TransferBuffer>,
    requests: Receiver<Vec<u8>>,
}

impl Dispatcher {
    pub(crate) fn new(
        store: Box<dyn BackingStore>,
        status: Arc<StatusChannel>,
        transfer: Arc<TransferBuffer>,
        requests: Receiver<Vec<u8>>,
    ) -> Self {
        Dispatcher { store, status, transfer, requests }
    }

    /// Serve requests until the channel disconnects.
    pub fn run(mut self) {
        while let Ok(envelope) = self.requests.recv() {
            let reply = self.process(&envelope);
            self.status.signal(reply.status_value(), reply.success);
        }
        debug!("dispatcher shutting down");
    }

    /// One full request: never returns an error, only a reply.
    ///
    /// An escaped error here would have no observer other than the
    /// signaling path, so everything is funneled into it.
    fn process(&mut self, envelope: &[u8]) -> Reply {
        match self.execute(envelope) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "request failed");
                Reply::failure(&err)
            }
        }
    }

    fn execute(&mut self, envelope: &[u8]) -> Result<Reply> {
        let request = Request::decode(envelope)?;
        debug!(cmd = request.name(), "dispatch");

        match request {
            Request::Open { path, flags } => {
                let mode = OpenMode::parse(&flags)?;
                let fd = self.store.open(&path, mode)?;
                Ok(Reply::with_fd(fd))
            }
            Request::Close { fd } => {
                self.store.close(fd)?;
                Ok(Reply::unit())
            }
            Request::Read { fd, offset, size } => {
                // The payload lands in the transfer buffer before the
                // signal; by the time the requester sees ready=1 the
                // bytes are already in place.
                let store = &mut self.store;
                let n = self
                    .transfer
                    .stage_with(size, |buf| store.pread(fd, buf, offset))?;
                Ok(Reply::with_length(n as u64))
            }
            Request::Write { fd, offset, size } => {
                let store = &mut self.store;
                let n = self
                    .transfer
                    .consume_with(size, |bytes| store.pwrite(fd, bytes, offset))?;
                Ok(Reply::with_length(n as u64))
            }
            Request::Size { fd } => Ok(Reply::with_length(self.store.size(fd)?)),
            Request::Sync { fd } => {
                self.store.sync(fd)?;
                Ok(Reply::unit())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CODE_BAD_FD, CODE_CAPACITY, CODE_DECODE};
    use crate::store::MemoryStore;
    use crossbeam::channel::unbounded;

    fn dispatcher(capacity: usize) -> Dispatcher {
        let (_tx, rx) = unbounded();
        Dispatcher::new(
            Box::new(MemoryStore::new()),
            Arc::new(StatusChannel::new()),
            Arc::new(TransferBuffer::new(capacity)),
            rx,
        )
    }

    fn envelope(req: &Request) -> Vec<u8> {
        req.encode().unwrap()
    }

    #[test]
    fn test_open_returns_fd() {
        let mut d = dispatcher(1024);
        let reply = d.process(&envelope(&Request::Open {
            path: "a.bin".into(),
            flags: "a+".into(),
        }));
        assert!(reply.success);
        assert_eq!(reply.fd, Some(3));
    }

    #[test]
    fn test_write_then_read_through_transfer() {
        let mut d = dispatcher(1024);
        let open = d.process(&envelope(&Request::Open {
            path: "a.bin".into(),
            flags: "a+".into(),
        }));
        let fd = open.fd.unwrap();

        d.transfer.stage(b"payload").unwrap();
        let write = d.process(&envelope(&Request::Write { fd, offset: 0, size: 7 }));
        assert!(write.success);
        assert_eq!(write.length, Some(7));

        let read = d.process(&envelope(&Request::Read { fd, offset: 0, size: 7 }));
        assert!(read.success);
        assert_eq!(read.length, Some(7));
        let mut buf = [0u8; 7];
        d.transfer.read_into(&mut buf).unwrap();
        assert_eq!(&buf, b"payload");
    }

    #[test]
    fn test_unknown_command_reports_decode_code() {
        let mut d = dispatcher(1024);
        let reply = d.process(br#"{"cmd":"truncate","fd":3}"#);
        assert!(!reply.success);
        assert_eq!(reply.status_value(), -CODE_DECODE);
    }

    #[test]
    fn test_malformed_envelope_reports_decode_code() {
        let mut d = dispatcher(1024);
        let reply = d.process(b"\x00\x01\x02");
        assert!(!reply.success);
        assert_eq!(reply.status_value(), -CODE_DECODE);
    }

    #[test]
    fn test_bad_fd_reports_code() {
        let mut d = dispatcher(1024);
        let reply = d.process(&envelope(&Request::Size { fd: 99 }));
        assert!(!reply.success);
        assert_eq!(reply.status_value(), -CODE_BAD_FD);
    }

    #[test]
    fn test_oversized_read_reports_capacity_code() {
        let mut d = dispatcher(16);
        let open = d.process(&envelope(&Request::Open {
            path: "a.bin".into(),
            flags: "a+".into(),
        }));
        let fd = open.fd.unwrap();

        let reply = d.process(&envelope(&Request::Read { fd, offset: 0, size: 64 }));
        assert!(!reply.success);
        assert_eq!(reply.status_value(), -CODE_CAPACITY);
    }

    #[test]
    fn test_failure_still_signals() {
        // run() must signal even for garbage; a silent failure would
        // leave the requester blocked forever.
        let (tx, rx) = unbounded();
        let status = Arc::new(StatusChannel::new());
        let d = Dispatcher::new(
            Box::new(MemoryStore::new()),
            Arc::clone(&status),
            Arc::new(TransferBuffer::new(64)),
            rx,
        );
        let worker = std::thread::spawn(move || d.run());

        status.reset();
        tx.send(b"garbage".to_vec()).unwrap();
        let (value, ok) = status.wait_ready();
        assert!(!ok);
        assert!(value < 0);

        drop(tx);
        worker.join().unwrap();
    }
}
