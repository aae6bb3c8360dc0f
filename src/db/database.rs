//! Database file abstraction for SQLite.

use rusqlite::{Connection, OpenFlags, Statement};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::header::{read_header, DbHeader};
use super::schema::{quote_identifier, read_table_info, read_table_names, ColumnInfo};
use super::value::{QueryResult, Value};
use super::{Error, Result};

/// Summary of a loaded database.
#[derive(Debug, Clone)]
pub struct DbInfo {
    pub header: DbHeader,
    pub table_count: usize,
}

/// A loaded SQLite database file.
///
/// The engine connection is opened read-only; statements that would modify
/// the file fail.
pub struct Database {
    conn: Connection,
    path: PathBuf,
    header: DbHeader,
}

impl Database {
    /// Open a SQLite database file.
    ///
    /// The header is validated before the engine sees the file, and the
    /// schema is read once so that a corrupt file fails here rather than on
    /// the first query.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// Returns the loaded database, or `Error::Io` / `Error::InvalidFormat`
    /// for unreadable or non-SQLite files and `Error::Load` when the engine
    /// rejects the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening database");

        let header = read_header(path)?;
        let load_err = |source| Error::Load {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(load_err)?;
        let entries: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get(0))
            .map_err(load_err)?;

        info!(
            path = %path.display(),
            page_size = header.page_size,
            schema_entries = entries,
            "database loaded"
        );

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &DbHeader {
        &self.header
    }

    /// Names of all user tables, in catalog order.
    pub fn table_names(&self) -> Result<Vec<String>> {
        read_table_names(&self.conn).map_err(Error::TableNames)
    }

    /// Column structure of `table`. An unknown table has no columns.
    pub fn table_schema(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        read_table_info(&self.conn, table).map_err(|source| Error::TableSchema {
            table: table.to_string(),
            source,
        })
    }

    /// Every row of `table`.
    pub fn query_table(&self, table: &str) -> Result<QueryResult> {
        let table_err = |source| Error::TableData {
            table: table.to_string(),
            source,
        };

        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql).map_err(table_err)?;
        let result = collect_rows(&mut stmt).map_err(table_err)?;
        debug!(table, rows = result.len(), "table read");
        Ok(result)
    }

    /// Number of rows in `table`.
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT count(*) FROM {}", quote_identifier(table));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|source| Error::TableData {
                table: table.to_string(),
                source,
            })?;
        Ok(count as u64)
    }

    /// Run a single SQL statement and return its rows.
    ///
    /// Statements that produce no result columns return an empty result.
    pub fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if sql.trim().is_empty() {
            return Ok(QueryResult::default());
        }

        let mut stmt = self.conn.prepare(sql).map_err(Error::Query)?;
        if stmt.column_count() == 0 {
            stmt.execute([]).map_err(Error::Query)?;
            return Ok(QueryResult::default());
        }
        let result = collect_rows(&mut stmt).map_err(Error::Query)?;
        debug!(rows = result.len(), columns = result.columns.len(), "query executed");
        Ok(result)
    }

    pub fn info(&self) -> Result<DbInfo> {
        Ok(DbInfo {
            header: self.header.clone(),
            table_count: self.table_names()?.len(),
        })
    }

    /// Close the engine connection.
    pub fn close(self) -> Result<()> {
        debug!(path = %self.path.display(), "closing database");
        self.conn.close().map_err(|(_, source)| Error::Close(source))
    }
}

fn collect_rows(stmt: &mut Statement<'_>) -> rusqlite::Result<QueryResult> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(Value::from(row.get_ref(idx)?));
        }
        rows.push(values);
    }

    Ok(QueryResult { columns, rows })
}
