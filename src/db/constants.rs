//! Constants used throughout the SQLite database parsing.

/// Magic string at the start of every SQLite database file.
pub const HEADER_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the database header (on page 1).
pub const DB_HEADER_SIZE: usize = 100;

/// Offset of page size in database header.
pub const PAGE_SIZE_OFFSET: usize = 16;

/// Offset of the in-header database size, in pages.
pub const PAGE_COUNT_OFFSET: usize = 28;

/// Offset of the total number of freelist pages.
pub const FREELIST_COUNT_OFFSET: usize = 36;

/// Offset of the schema format number.
pub const SCHEMA_FORMAT_OFFSET: usize = 44;

/// Offset of the database text encoding.
pub const TEXT_ENCODING_OFFSET: usize = 56;

/// Offset of the user version (`PRAGMA user_version`).
pub const USER_VERSION_OFFSET: usize = 60;

/// Offset of the application id (`PRAGMA application_id`).
pub const APPLICATION_ID_OFFSET: usize = 68;

/// Offset of the SQLite version number that last wrote the file.
pub const SQLITE_VERSION_OFFSET: usize = 96;

/// Smallest and largest page sizes SQLite accepts.
pub const MIN_PAGE_SIZE: u32 = 512;
pub const MAX_PAGE_SIZE: u32 = 65536;
