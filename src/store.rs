//! Store module for sqlai
//!
//! This module provides the embedded relational store that owns all tables.
//! It wraps a single SQLite connection, either backed by a database file
//! (one per deployment) or held in memory for tests.

use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::{Connection, OpenFlags};

use crate::error::{SqlaiError, SqlaiResult};

/// Central store that owns the SQLite connection
pub struct Store {
    /// Open connection to the database
    conn: Connection,

    /// Database file, `None` for in-memory stores
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create the database file at `path`
    ///
    /// Opening is lazy in SQLite: a file that is not a database is only
    /// detected by the first statement, which then fails with a schema or
    /// execution error.
    pub fn open<P: AsRef<Path>>(path: P) -> SqlaiResult<Self> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            SqlaiError::SchemaError(format!(
                "unable to open database '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!("opened database {}", path.display());
        Ok(Store {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create a private in-memory store
    pub fn open_in_memory() -> SqlaiResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SqlaiError::SchemaError(format!("unable to open database: {}", e)))?;
        Ok(Store { conn, path: None })
    }

    /// Shared access to the connection for reads
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Exclusive access to the connection for transactions
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Database file backing this store, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Count the rows of a table
    ///
    /// # Returns
    /// * `Ok(count)` if the table exists
    /// * `Err(TableNotFound)` if it doesn't
    /// * `Err(SchemaError)` for any other engine failure
    pub fn row_count(&self, table_name: &str) -> SqlaiResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
            .map_err(|e| {
                if names_missing_table(&e, table_name) {
                    SqlaiError::TableNotFound(table_name.to_string())
                } else {
                    SqlaiError::SchemaError(format!(
                        "unable to count rows of '{}': {}",
                        table_name, e
                    ))
                }
            })
    }
}

/// Whether `err` reports that `table_name` itself does not exist
///
/// A view over a dropped table reports the dropped table, not the view.
fn names_missing_table(err: &rusqlite::Error, table_name: &str) -> bool {
    let rusqlite::Error::SqliteFailure(_, Some(message)) = err else {
        return false;
    };
    message
        .strip_prefix("no such table: ")
        .map(|name| name.strip_prefix("main.").unwrap_or(name))
        .is_some_and(|name| name.eq_ignore_ascii_case(table_name))
}

/// Quote an identifier for use in generated SQL
///
/// Wraps the name in double quotes and doubles any embedded quote, so column
/// headers taken from uploaded files can contain spaces or punctuation.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
