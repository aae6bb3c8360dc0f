//! Table catalog and column structure.

use rusqlite::{Connection, Row};
use serde::Serialize;

/// User tables, excluding the engine's own `sqlite_*` bookkeeping tables.
const TABLE_NAMES_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'";

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    /// Declared type, empty when the column was declared without one.
    pub decl_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position within the primary key, 0 if not part of it.
    pub primary_key: u32,
}

impl ColumnInfo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            cid: row.get(0)?,
            name: row.get(1)?,
            decl_type: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            default_value: row.get(4)?,
            primary_key: row.get(5)?,
        })
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key > 0
    }
}

/// Quote `name` as an SQL identifier so it can be spliced into a statement.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn read_table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(TABLE_NAMES_SQL)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

pub(crate) fn read_table_info(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map([], ColumnInfo::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("order items"), "\"order items\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn reads_column_info() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (
                 a INTEGER NOT NULL,
                 b TEXT DEFAULT 'x',
                 c,
                 PRIMARY KEY (b, a)
             );",
        )
        .unwrap();

        let columns = read_table_info(&conn, "t").unwrap();
        assert_eq!(columns.len(), 3);

        assert_eq!(columns[0].name, "a");
        assert_eq!(columns[0].decl_type, "INTEGER");
        assert!(columns[0].not_null);
        assert_eq!(columns[0].primary_key, 2);

        assert_eq!(columns[1].default_value.as_deref(), Some("'x'"));
        assert_eq!(columns[1].primary_key, 1);

        assert_eq!(columns[2].decl_type, "");
        assert!(!columns[2].is_primary_key());
        assert_eq!(columns[2].default_value, None);
    }

    #[test]
    fn internal_tables_are_hidden() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
             INSERT INTO users (name) VALUES ('ada');
             CREATE TABLE notes (body TEXT);
             CREATE VIEW v AS SELECT * FROM users;",
        )
        .unwrap();

        let names = read_table_names(&conn).unwrap();
        assert_eq!(names, vec!["users", "notes"]);
    }
}
