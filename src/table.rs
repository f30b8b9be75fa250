//! Table module for sqlai
//!
//! This module provides the cell and result representations shared by
//! ingestion and query execution:
//!
//! - Cell values read from delimited files or returned by the store
//! - Column type inference for uploaded data
//! - Tabular query results with delimited-text rendering

use std::fmt;
use std::io::Write;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

use crate::error::SqlaiResult;

/// Represents a value in a table cell
///
/// The variants mirror SQLite's storage classes so values can travel between
/// the store and the user without loss.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Represents a NULL or missing value
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Real(f64),
    /// UTF-8 string
    Text(String),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// Declared type of an ingested column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Infer the narrowest type that holds every non-empty cell
    ///
    /// Cells are tried in the order integer, float, text. Empty cells are
    /// ignored because they become NULL. A column with no non-empty cells
    /// is TEXT.
    pub fn infer<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut column_type = None;
        for cell in cells {
            if cell.is_empty() {
                continue;
            }
            let cell_type = if cell.parse::<i64>().is_ok() {
                ColumnType::Integer
            } else if cell.bytes().any(|b| b.is_ascii_digit()) && cell.parse::<f64>().is_ok() {
                // "inf" and "NaN" parse as floats but are text in a CSV
                ColumnType::Real
            } else {
                return ColumnType::Text;
            };
            column_type = Some(match (column_type, cell_type) {
                (None, t) => t,
                (Some(ColumnType::Integer), ColumnType::Integer) => ColumnType::Integer,
                _ => ColumnType::Real,
            });
        }
        column_type.unwrap_or(ColumnType::Text)
    }

    /// SQL type name used in the generated CREATE TABLE
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// Convert a raw cell into a value of this column type
    ///
    /// Empty cells become NULL. A TEXT column keeps numeric-looking cells as
    /// text so values such as `007` survive unchanged.
    pub fn parse_cell(&self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        match self {
            ColumnType::Integer => cell
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            ColumnType::Real => cell
                .parse::<f64>()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            ColumnType::Text => Value::Text(cell.to_string()),
        }
    }
}

/// Rows returned by a read statement
///
/// Column names come from the statement's result descriptor, in order. The
/// row list may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the result as comma-separated text with a header row
    pub fn write_delimited<W: Write>(&self, writer: W) -> SqlaiResult<()> {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        csv_writer
            .write_record(&self.columns)
            .map_err(std::io::Error::from)?;
        for row in &self.rows {
            csv_writer
                .write_record(row.iter().map(|value| value.to_string()))
                .map_err(std::io::Error::from)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Print the result to stdout in delimited format
    pub fn print_to_stdout(&self) -> SqlaiResult<()> {
        let stdout = std::io::stdout();
        self.write_delimited(stdout.lock())
    }
}
