//! SQLite database file header (page 1)
//!
//! The key-value store synthesizes a freshly created database as a single
//! page whose first 100 bytes are the database header and whose byte 100
//! begins an empty leaf table b-tree page. The consuming engine validates
//! this header strictly on first read, so the synthesized bytes must match
//! what the reference implementation writes for an empty database. All
//! multi-byte fields are big-endian.

use crate::error::{Result, VfsError};

/// Format identification string occupying bytes 0..16.
pub const MAGIC: [u8; 16] = *b"SQLite format 3\0";

/// Fixed page size for synthesized databases.
pub const PAGE_SIZE: usize = 4096;

/// Maximum embedded payload fraction (byte 21, required value).
pub const MAX_PAYLOAD_FRACTION: u8 = 64;
/// Minimum embedded payload fraction (byte 22, required value).
pub const MIN_PAYLOAD_FRACTION: u8 = 32;
/// Minimum leaf payload fraction (byte 23, required value).
pub const LEAF_PAYLOAD_FRACTION: u8 = 32;

/// Page type flag for a leaf table b-tree page (byte 100 of page 1).
pub const LEAF_TABLE_PAGE: u8 = 0x0d;

/// Library version number recorded at bytes 96..100 of synthesized files.
const CREATOR_VERSION: u32 = 0x003c_2c04;

/// Parsed view of the database header fields this crate cares about.
///
/// Synthesis always emits the same fixed header; parsing exists for tests
/// and for the advisory format check at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbHeader {
    /// Page size in bytes (bytes 16..18).
    pub page_size: u32,
    /// File change counter (bytes 24..28).
    pub change_counter: u32,
    /// Database size in pages (bytes 28..32).
    pub page_count: u32,
    /// Schema cookie (bytes 40..44).
    pub schema_cookie: u32,
    /// Schema format number (bytes 44..48).
    pub schema_format: u32,
    /// Text encoding marker (bytes 56..60); 1 is UTF-8.
    pub text_encoding: u32,
    /// Version-valid-for number (bytes 92..96).
    pub version_valid_for: u32,
}

impl DbHeader {
    /// Header values for a freshly created, empty database.
    pub fn new() -> Self {
        DbHeader {
            page_size: PAGE_SIZE as u32,
            change_counter: 1,
            page_count: 1,
            schema_cookie: 1,
            schema_format: 4,
            text_encoding: 1,
            version_valid_for: 1,
        }
    }

    /// Parse the header fields out of the first 100 bytes of a file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 100 {
            return Err(VfsError::Format(format!(
                "header needs 100 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0..16] != MAGIC {
            return Err(VfsError::Format("bad magic string".into()));
        }

        let be16 = |off: usize| u32::from(u16::from_be_bytes([bytes[off], bytes[off + 1]]));
        let be32 = |off: usize| {
            u32::from_be_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };

        // Page size 1 encodes 65536.
        let raw_page_size = be16(16);
        let page_size = if raw_page_size == 1 { 65536 } else { raw_page_size };

        let header = DbHeader {
            page_size,
            change_counter: be32(24),
            page_count: be32(28),
            schema_cookie: be32(40),
            schema_format: be32(44),
            text_encoding: be32(56),
            version_valid_for: be32(92),
        };
        header.validate()?;
        Ok(header)
    }

    /// Validate the fields a reader depends on.
    pub fn validate(&self) -> Result<()> {
        if !(512..=65536).contains(&self.page_size) || !self.page_size.is_power_of_two() {
            return Err(VfsError::Format(format!(
                "invalid page size {}",
                self.page_size
            )));
        }
        if self.page_count == 0 {
            return Err(VfsError::Format("zero page count".into()));
        }
        if !(1..=3).contains(&self.text_encoding) {
            return Err(VfsError::Format(format!(
                "invalid text encoding {}",
                self.text_encoding
            )));
        }
        Ok(())
    }
}

impl Default for DbHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Quick check that a buffer starts with the format identification string.
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

/// Synthesize the complete initial content of an empty database file.
///
/// Produces exactly one page: the 100-byte database header followed by the
/// b-tree header of an empty leaf table page (zero cells, cell content
/// area starting at the page end).
pub fn initial_database_page() -> Vec<u8> {
    let header = DbHeader::new();
    let mut page = vec![0u8; PAGE_SIZE];

    page[0..16].copy_from_slice(&MAGIC);
    page[16..18].copy_from_slice(&(header.page_size as u16).to_be_bytes());
    page[18] = 1; // file format write version
    page[19] = 1; // file format read version
    page[20] = 0; // reserved space per page
    page[21] = MAX_PAYLOAD_FRACTION;
    page[22] = MIN_PAYLOAD_FRACTION;
    page[23] = LEAF_PAYLOAD_FRACTION;
    page[24..28].copy_from_slice(&header.change_counter.to_be_bytes());
    page[28..32].copy_from_slice(&header.page_count.to_be_bytes());
    // 32..40: freelist trunk page and freelist page count stay zero
    page[40..44].copy_from_slice(&header.schema_cookie.to_be_bytes());
    page[44..48].copy_from_slice(&header.schema_format.to_be_bytes());
    // 48..56: default cache size and largest-root-page (no auto-vacuum) stay zero
    page[56..60].copy_from_slice(&header.text_encoding.to_be_bytes());
    // 60..92: user version, incremental vacuum, application id, reserved: zero
    page[92..96].copy_from_slice(&header.version_valid_for.to_be_bytes());
    page[96..100].copy_from_slice(&CREATOR_VERSION.to_be_bytes());

    // Page 1 b-tree header: empty leaf table page.
    page[100] = LEAF_TABLE_PAGE;
    // 101..103: first freeblock, none
    // 103..105: cell count, zero
    page[105..107].copy_from_slice(&(header.page_size as u16).to_be_bytes());
    page[107] = 0; // fragmented free bytes

    page
}
