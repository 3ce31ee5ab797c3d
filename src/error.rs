//! Error types for VFS bridge operations

use thiserror::Error;

/// Wire code for failures whose natural magnitude would be zero.
///
/// Slot 1 of the status record carries the negated code, so every failure
/// must map to a nonzero value for the sign to disambiguate.
pub const CODE_GENERIC: i32 = 1;
/// Wire code for a missing file or an open without create permission.
pub const CODE_NOT_FOUND: i32 = 2;
/// Wire code for an operation naming an fd with no live handle.
pub const CODE_BAD_FD: i32 = 3;
/// Wire code for a payload exceeding the transfer buffer capacity.
pub const CODE_CAPACITY: i32 = 4;
/// Wire code for an unrecognized command or malformed envelope.
pub const CODE_DECODE: i32 = 5;
/// Wire code for an underlying storage failure.
pub const CODE_STORAGE: i32 = 6;
/// Wire code for an unexpected or corrupt database header.
pub const CODE_FORMAT: i32 = 7;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("No such file: {0}")]
    NotFound(String),

    #[error("Invalid file descriptor: {0}")]
    BadFd(i32),

    #[error("Payload of {len} bytes exceeds transfer capacity of {capacity}")]
    Capacity { len: usize, capacity: usize },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid database header: {0}")]
    Format(String),

    #[error("Dispatcher is gone: {0}")]
    Disconnected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VfsError {
    /// Stable nonzero code carried (negated) in slot 1 of the status record.
    pub fn code(&self) -> i32 {
        match self {
            VfsError::NotFound(_) => CODE_NOT_FOUND,
            VfsError::BadFd(_) => CODE_BAD_FD,
            VfsError::Capacity { .. } => CODE_CAPACITY,
            VfsError::Decode(_) | VfsError::Serialization(_) => CODE_DECODE,
            VfsError::Storage(_) | VfsError::Disconnected(_) | VfsError::Io(_) => CODE_STORAGE,
            VfsError::Format(_) => CODE_FORMAT,
        }
    }

    /// Rebuild a typed error from a wire code observed by the requester.
    ///
    /// The dispatcher's message text does not cross the status channel, so
    /// the reconstructed error carries only the taxonomy.
    pub fn from_code(code: i32) -> Self {
        match code {
            CODE_NOT_FOUND => VfsError::NotFound("remote".into()),
            CODE_BAD_FD => VfsError::BadFd(-1),
            CODE_CAPACITY => VfsError::Capacity { len: 0, capacity: 0 },
            CODE_DECODE => VfsError::Decode("remote".into()),
            CODE_FORMAT => VfsError::Format("remote".into()),
            _ => VfsError::Storage(format!("remote failure (code {})", code)),
        }
    }
}

pub type Result<T> = std::result::Result<T, VfsError>;
