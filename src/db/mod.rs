//! SQLite database loading and inspection.
//!
//! All data access goes through the embedded SQLite engine; only the file
//! header is parsed by hand, to reject non-database files up front.

mod constants;
mod database;
mod header;
mod schema;
mod value;

use std::path::PathBuf;
use thiserror::Error;

// Re-export public API
pub use database::{Database, DbInfo};
pub use header::{read_header, DbHeader, HeaderError, TextEncoding};
pub use schema::{quote_identifier, ColumnInfo};
pub use value::{QueryResult, Value};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a valid SQLite database file", .path.display())]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: HeaderError,
    },
    #[error("failed to load SQLite database {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("cannot list the tables of the database")]
    TableNames(#[source] rusqlite::Error),
    #[error("cannot read the structure of table `{table}`")]
    TableSchema {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("cannot read the data of table `{table}`")]
    TableData {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query failed")]
    Query(#[source] rusqlite::Error),
    #[error("failed to close the database")]
    Close(#[source] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
