//! Database header parsing for SQLite format.

use bytes::Buf;
use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use super::constants::{
    APPLICATION_ID_OFFSET, DB_HEADER_SIZE, FREELIST_COUNT_OFFSET, HEADER_MAGIC, MAX_PAGE_SIZE,
    MIN_PAGE_SIZE, PAGE_COUNT_OFFSET, PAGE_SIZE_OFFSET, SCHEMA_FORMAT_OFFSET,
    SQLITE_VERSION_OFFSET, TEXT_ENCODING_OFFSET, USER_VERSION_OFFSET,
};
use super::{Error, Result};

/// Reasons a byte buffer is not a SQLite database header.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("file is {0} bytes, shorter than the 100-byte database header")]
    TooShort(usize),
    #[error("missing \"SQLite format 3\" magic string")]
    BadMagic,
    #[error("invalid page size {0}")]
    InvalidPageSize(u32),
}

/// Text encoding recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Unknown(u32),
}

impl From<u32> for TextEncoding {
    fn from(raw: u32) -> Self {
        match raw {
            1 => TextEncoding::Utf8,
            2 => TextEncoding::Utf16Le,
            3 => TextEncoding::Utf16Be,
            n => TextEncoding::Unknown(n),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf8"),
            TextEncoding::Utf16Le => write!(f, "utf16le"),
            TextEncoding::Utf16Be => write!(f, "utf16be"),
            TextEncoding::Unknown(n) => write!(f, "unknown ({n})"),
        }
    }
}

/// The fields of the 100-byte database header this tool reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbHeader {
    pub page_size: u32,
    pub write_version: u8,
    pub read_version: u8,
    pub page_count: u32,
    pub freelist_pages: u32,
    pub schema_format: u32,
    pub text_encoding: TextEncoding,
    pub user_version: u32,
    pub application_id: u32,
    pub sqlite_version: u32,
}

impl DbHeader {
    /// Parse the database header from the first bytes of a file.
    ///
    /// The page size is stored at byte offset 16-17 as a 2-byte big-endian
    /// integer; the value 1 stands for 65536. All other multi-byte fields are
    /// 4-byte big-endian integers.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, HeaderError> {
        if data.len() < DB_HEADER_SIZE {
            return Err(HeaderError::TooShort(data.len()));
        }
        if &data[..HEADER_MAGIC.len()] != HEADER_MAGIC {
            return Err(HeaderError::BadMagic);
        }

        let mut buf = &data[PAGE_SIZE_OFFSET..];
        let page_size = match buf.get_u16() {
            1 => MAX_PAGE_SIZE,
            n => u32::from(n),
        };
        if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(HeaderError::InvalidPageSize(page_size));
        }
        let write_version = buf.get_u8();
        let read_version = buf.get_u8();

        Ok(Self {
            page_size,
            write_version,
            read_version,
            page_count: u32_at(data, PAGE_COUNT_OFFSET),
            freelist_pages: u32_at(data, FREELIST_COUNT_OFFSET),
            schema_format: u32_at(data, SCHEMA_FORMAT_OFFSET),
            text_encoding: TextEncoding::from(u32_at(data, TEXT_ENCODING_OFFSET)),
            user_version: u32_at(data, USER_VERSION_OFFSET),
            application_id: u32_at(data, APPLICATION_ID_OFFSET),
            sqlite_version: u32_at(data, SQLITE_VERSION_OFFSET),
        })
    }

    /// Version of the library that last wrote the file, e.g. `3.45.1`.
    pub fn sqlite_version_string(&self) -> String {
        let v = self.sqlite_version;
        format!("{}.{}.{}", v / 1_000_000, (v / 1000) % 1000, v % 1000)
    }
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    let mut buf = &data[offset..offset + 4];
    buf.get_u32()
}

/// Read and validate the database header of the file at `path`.
///
/// A stale in-header page count (older writers leave it at zero) is replaced
/// by the page count derived from the file size.
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// Returns the parsed header, `Error::Io` if the file cannot be read, or
/// `Error::InvalidFormat` if it does not start with a valid header.
pub fn read_header(path: &Path) -> Result<DbHeader> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let file_len = file.metadata().map_err(io_err)?.len();

    let mut data = Vec::with_capacity(DB_HEADER_SIZE);
    file.take(DB_HEADER_SIZE as u64)
        .read_to_end(&mut data)
        .map_err(io_err)?;

    let mut header = DbHeader::parse(&data).map_err(|source| Error::InvalidFormat {
        path: path.to_path_buf(),
        source,
    })?;
    if header.page_count == 0 {
        header.page_count = (file_len / u64::from(header.page_size)) as u32;
    }
    Ok(header)
}
