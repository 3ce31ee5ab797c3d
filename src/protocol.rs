//! Request envelope and result shapes for the command dispatcher
//!
//! Requests cross the execution-context boundary as JSON envelopes of
//! the form `{cmd, fd?, path?, offset?, size?}`. Replies never cross as
//! messages;
//! they are encoded into the status record, so [`Reply`] is the
//! pre-encoding form only.

use crate::error::{Result, VfsError};
use serde::{Deserialize, Serialize};

/// One VFS operation request.
///
/// Exactly the fields relevant to each command are present. `write`
/// carries only the payload length; the payload itself travels through
/// the transfer buffer, never through the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Request {
    Open {
        path: String,
        #[serde(default)]
        flags: String,
    },
    Close {
        fd: i32,
    },
    Read {
        fd: i32,
        offset: u64,
        size: usize,
    },
    Write {
        fd: i32,
        offset: u64,
        size: usize,
    },
    Size {
        fd: i32,
    },
    Sync {
        fd: i32,
    },
}

impl Request {
    /// Serialize to the JSON wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a wire envelope.
    ///
    /// Unknown commands and malformed envelopes both surface as decode
    /// errors so the dispatcher can report them through the status
    /// channel instead of letting them escape.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| VfsError::Decode(e.to_string()))
    }

    /// Command name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Open { .. } => "open",
            Request::Close { .. } => "close",
            Request::Read { .. } => "read",
            Request::Write { .. } => "write",
            Request::Size { .. } => "size",
            Request::Sync { .. } => "sync",
        }
    }
}

/// Outcome of one executed request, before status-record encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub success: bool,
    pub fd: Option<i32>,
    pub length: Option<u64>,
    pub error: Option<String>,
    code: i32,
}

impl Reply {
    /// Successful open, returning the new descriptor.
    pub fn with_fd(fd: i32) -> Self {
        Reply { success: true, fd: Some(fd), length: None, error: None, code: 0 }
    }

    /// Successful read/write/size, returning a byte count.
    pub fn with_length(length: u64) -> Self {
        Reply { success: true, fd: None, length: Some(length), error: None, code: 0 }
    }

    /// Successful close/sync with no value.
    pub fn unit() -> Self {
        Reply { success: true, fd: None, length: None, error: None, code: 0 }
    }

    /// Failed request carrying the error's wire code and message.
    pub fn failure(err: &VfsError) -> Self {
        Reply {
            success: false,
            fd: None,
            length: None,
            error: Some(err.to_string()),
            code: err.code(),
        }
    }

    /// Value for slot 1 of the status record.
    ///
    /// On success this is the fd or byte count (zero for unit replies);
    /// on failure the negated error code, which is always nonzero so the
    /// sign alone disambiguates even a zero-magnitude result.
    pub fn status_value(&self) -> i32 {
        if self.success {
            self.fd
                .unwrap_or_else(|| self.length.unwrap_or(0) as i32)
        } else {
            -self.code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CODE_NOT_FOUND;

    #[test]
    fn test_wire_shape_matches_contract() {
        let req = Request::Read { fd: 3, offset: 4096, size: 512 };
        let json: serde_json::Value =
            serde_json::from_slice(&req.encode().unwrap()).unwrap();
        assert_eq!(json["cmd"], "read");
        assert_eq!(json["fd"], 3);
        assert_eq!(json["offset"], 4096);
        assert_eq!(json["size"], 512);
    }

    #[test]
    fn test_envelope_round_trip() {
        let requests = [
            Request::Open { path: "db.bin".into(), flags: "a+".into() },
            Request::Close { fd: 3 },
            Request::Read { fd: 3, offset: 0, size: 4096 },
            Request::Write { fd: 3, offset: 8192, size: 100 },
            Request::Size { fd: 3 },
            Request::Sync { fd: 3 },
        ];
        for req in &requests {
            let decoded = Request::decode(&req.encode().unwrap()).unwrap();
            assert_eq!(&decoded, req);
        }
    }

    #[test]
    fn test_unknown_command_is_decode_error() {
        let result = Request::decode(br#"{"cmd":"stat","fd":3}"#);
        assert!(matches!(result, Err(VfsError::Decode(_))));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            Request::decode(b"not json"),
            Err(VfsError::Decode(_))
        ));
    }

    #[test]
    fn test_open_flags_default_to_empty() {
        let req = Request::decode(br#"{"cmd":"open","path":"db.bin"}"#).unwrap();
        assert_eq!(req, Request::Open { path: "db.bin".into(), flags: String::new() });
    }

    #[test]
    fn test_status_value_success() {
        assert_eq!(Reply::with_fd(7).status_value(), 7);
        assert_eq!(Reply::with_length(512).status_value(), 512);
        assert_eq!(Reply::unit().status_value(), 0);
    }

    #[test]
    fn test_status_value_failure_is_negated_code() {
        let reply = Reply::failure(&VfsError::NotFound("x".into()));
        assert_eq!(reply.status_value(), -CODE_NOT_FOUND);
        assert!(reply.status_value() < 0);
    }
}
