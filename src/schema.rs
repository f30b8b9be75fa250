//! Schema introspection for sqlai
//!
//! This module reads the live structure of the store into a
//! [`SchemaSnapshot`]: every user-visible table with its columns and declared
//! types, in definition order.
//!
//! A snapshot is a plain value. It is never updated in place; callers take a
//! new one after any ingestion or mutating statement.

use std::fmt;

use log::debug;
use rusqlite::Connection;

use crate::error::{SqlaiError, SqlaiResult};
use crate::store::Store;

/// A column name with its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// Declared type as written in the table definition, possibly empty
    pub declared_type: String,
}

/// One table and its ordered columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if column.declared_type.is_empty() {
                write!(f, "{}", column.name)?;
            } else {
                write!(f, "{} {}", column.name, column.declared_type)?;
            }
        }
        write!(f, ")")
    }
}

/// Point-in-time mapping from table name to its ordered columns
///
/// Tables keep the store's definition order. `Display` renders the canonical
/// text form embedded in prompts, one table per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    tables: Vec<TableSchema>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        SchemaSnapshot { tables }
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Look up a table by exact name
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

impl fmt::Display for SchemaSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, table) in self.tables.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", table)?;
        }
        Ok(())
    }
}

/// Reads schema snapshots from a store
pub struct SchemaInspector;

impl SchemaInspector {
    /// Capture the current schema of `store`
    ///
    /// All reads happen inside one deferred transaction so the snapshot is
    /// consistent. Internal `sqlite_*` tables are skipped.
    ///
    /// # Returns
    /// * `Ok(SchemaSnapshot)` with every table and column
    /// * `Err(SchemaError)` if the store cannot be read; no partial snapshot
    pub fn snapshot(store: &Store) -> SqlaiResult<SchemaSnapshot> {
        Self::snapshot_conn(store.conn()).map_err(|e| SqlaiError::SchemaError(e.to_string()))
    }

    fn snapshot_conn(conn: &Connection) -> rusqlite::Result<SchemaSnapshot> {
        let tx = conn.unchecked_transaction()?;

        let table_names = {
            let mut stmt = tx.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
                 ORDER BY rowid",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            names
        };

        let mut tables = Vec::with_capacity(table_names.len());
        {
            let mut stmt =
                tx.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
            for name in table_names {
                let columns = stmt
                    .query_map([&name], |row| {
                        Ok(ColumnDef {
                            name: row.get(0)?,
                            declared_type: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                tables.push(TableSchema { name, columns });
            }
        }

        tx.finish()?;
        debug!("schema snapshot: {} tables", tables.len());
        Ok(SchemaSnapshot::new(tables))
    }
}
