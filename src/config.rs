//! Bridge configuration
//!
//! Groups the knobs shared by the bridge and the backing stores: the
//! transfer buffer capacity, the root directory that relative paths
//! resolve against for the disk store, and the namespace prefix for
//! key-value entries.

use crate::error::{Result, VfsError};
use serde::Deserialize;
use std::path::PathBuf;

/// Default transfer buffer capacity (1 MiB).
pub const DEFAULT_TRANSFER_CAPACITY: usize = 1024 * 1024;

/// Default namespace prefix for key-value store entries.
pub const DEFAULT_KEY_PREFIX: &str = "files/";

/// VFS bridge configuration
///
/// Deserializable from TOML for host applications that carry a config
/// file; [`VfsConfig::default`] is suitable for embedded use as-is.
///
/// # Examples
///
/// ```
/// use relayfs::config::VfsConfig;
///
/// let config: VfsConfig = VfsConfig::from_toml_str(
///     "transfer_capacity = 65536\nroot_dir = \"/tmp/dbroot\"",
/// ).unwrap();
///
/// assert_eq!(config.transfer_capacity, 65536);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Capacity in bytes of the payload transfer buffer.
    ///
    /// A single read or write larger than this fails with a capacity
    /// error; the protocol has no chunked transfer.
    pub transfer_capacity: usize,

    /// Directory the disk store resolves relative logical paths against.
    pub root_dir: PathBuf,

    /// Prefix prepended to logical paths to form key-value store keys.
    pub key_prefix: String,
}

impl Default for VfsConfig {
    fn default() -> Self {
        VfsConfig {
            transfer_capacity: DEFAULT_TRANSFER_CAPACITY,
            root_dir: PathBuf::from("."),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl VfsConfig {
    /// Parse a configuration from TOML text.
    ///
    /// Missing fields fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: VfsConfig =
            toml::from_str(text).map_err(|e| VfsError::Decode(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bridge cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.transfer_capacity == 0 {
            return Err(VfsError::Decode(
                "config: transfer_capacity must be nonzero".into(),
            ));
        }
        Ok(())
    }

    /// Key-value store key for a logical file path.
    pub fn key_for(&self, path: &str) -> String {
        format!("{}{}", self.key_prefix, path)
    }
}
