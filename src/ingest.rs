//! CSV ingestion module for sqlai
//!
//! This module turns an uploaded CSV file into a table in the store.
//! It provides functionality for:
//!
//! - Parsing file specifications in the format `[table_name=]file_path.csv`
//! - Deriving an identifier-safe table name from the file name
//! - Decoding bytes as UTF-8 with an ISO-8859-1 fallback
//! - Inferring a declared type for every column
//! - Replacing any existing table of the same name in one transaction
//!
//! After a successful ingestion the schema has changed, so callers must take
//! a new schema snapshot before translating anything else.

use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SqlaiError, SqlaiResult};
use crate::store::{quote_identifier, Store};
use crate::table::{ColumnType, Value};

static NON_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").unwrap());

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "the schema changed; take a new snapshot before the next translation"]
pub struct IngestReport {
    /// Sanitized name of the table that was (re)created
    pub table_name: String,
    /// Column names with their inferred SQL types
    pub columns: Vec<(String, String)>,
    /// Number of rows inserted
    pub rows: usize,
}

/// A parsed, typed table ready to be written
#[derive(Debug)]
struct ParsedTable {
    headers: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

/// Loads CSV data into the store
#[derive(Debug, Default)]
pub struct DatasetIngestor;

impl DatasetIngestor {
    pub fn new() -> Self {
        DatasetIngestor
    }

    /// Load a CSV file described by `file_spec` into the store
    ///
    /// # Arguments
    /// * `file_spec` - `[table_name=]file_path`; without an explicit name the
    ///                 table is named after the file
    /// * `store` - Store receiving the table
    ///
    /// # Returns
    /// * `Ok(IngestReport)` if the table was replaced
    /// * `Err(IngestionError)` if the file cannot be read, parsed or written;
    ///   the store is left unchanged
    pub fn ingest_file(&self, file_spec: &str, store: &mut Store) -> SqlaiResult<IngestReport> {
        let (explicit_name, file_path) = parse_file_spec(file_spec)?;
        let table_name = match explicit_name {
            Some(name) => sanitize_table_name(&name),
            None => table_name_from_path(&file_path)?,
        };
        let bytes = std::fs::read(&file_path).map_err(|e| {
            SqlaiError::IngestionError(format!("cannot read {}: {}", file_path.display(), e))
        })?;
        debug!("read {} bytes from {}", bytes.len(), file_path.display());
        self.ingest_bytes(&table_name, &bytes, store)
    }

    /// Load raw CSV bytes into `table_name`, replacing any existing table
    pub fn ingest_bytes(
        &self,
        table_name: &str,
        bytes: &[u8],
        store: &mut Store,
    ) -> SqlaiResult<IngestReport> {
        if table_name.is_empty() {
            return Err(SqlaiError::IngestionError(
                "table name is empty after removing non-word characters".to_string(),
            ));
        }

        let text = decode_text(bytes);
        let parsed = parse_csv(&text)?;
        write_table(table_name, &parsed, store)
            .map_err(|e| SqlaiError::IngestionError(e.to_string()))?;

        let report = IngestReport {
            table_name: table_name.to_string(),
            columns: parsed
                .headers
                .iter()
                .zip(&parsed.types)
                .map(|(name, t)| (name.clone(), t.sql_name().to_string()))
                .collect(),
            rows: parsed.rows.len(),
        };
        info!(
            "ingested table '{}' ({} columns, {} rows)",
            report.table_name,
            report.columns.len(),
            report.rows
        );
        Ok(report)
    }
}

/// Remove every non-word character from a name
///
/// Word characters are Unicode letters, digits and underscore.
pub fn sanitize_table_name(name: &str) -> String {
    NON_WORD_REGEX.replace_all(name, "").into_owned()
}

/// Derive a table name from a file path
///
/// The base name is the file name up to its first dot, so both
/// `sales.csv` and `sales.2024.csv` become `sales`.
pub fn table_name_from_path(path: &Path) -> SqlaiResult<String> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SqlaiError::IngestionError(format!("invalid file name: {}", path.display()))
        })?;
    let base = file_name.split('.').next().unwrap_or_default();
    Ok(sanitize_table_name(base))
}

/// Parse a file specification into an optional table name and file path
///
/// Handles two formats:
/// 1. `table_name=file_path.csv` - Explicit table name and file path
/// 2. `file_path.csv` - Table name derived from file name
fn parse_file_spec(file_spec: &str) -> SqlaiResult<(Option<String>, PathBuf)> {
    match file_spec.split_once('=') {
        Some((name, path)) if !path.is_empty() => {
            Ok((Some(name.to_string()), PathBuf::from(path)))
        }
        Some(_) => Err(SqlaiError::IngestionError(format!(
            "invalid file specification: {}",
            file_spec
        ))),
        None => Ok((None, PathBuf::from(file_spec))),
    }
}

/// Decode bytes as UTF-8, falling back to ISO-8859-1
///
/// Every byte sequence is valid ISO-8859-1: each byte maps to the code point
/// of the same value.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
        Err(_) => {
            debug!("content is not UTF-8, decoding as ISO-8859-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

fn parse_csv(text: &str) -> SqlaiResult<ParsedTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = csv_reader
        .headers()
        .map_err(|e| SqlaiError::IngestionError(e.to_string()))?
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(SqlaiError::IngestionError(
            "file has no header row".to_string(),
        ));
    }

    let records = csv_reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SqlaiError::IngestionError(e.to_string()))?;

    let types = (0..headers.len())
        .map(|i| ColumnType::infer(records.iter().map(|r| r.get(i).unwrap_or(""))))
        .collect::<Vec<_>>();

    let rows = records
        .iter()
        .map(|record| {
            types
                .iter()
                .enumerate()
                .map(|(i, t)| t.parse_cell(record.get(i).unwrap_or("")))
                .collect()
        })
        .collect();

    Ok(ParsedTable {
        headers,
        types,
        rows,
    })
}

/// Drop, create and fill the table inside one transaction
fn write_table(table_name: &str, parsed: &ParsedTable, store: &mut Store) -> rusqlite::Result<()> {
    let table = quote_identifier(table_name);
    let column_defs = parsed
        .headers
        .iter()
        .zip(&parsed.types)
        .map(|(name, t)| format!("{} {}", quote_identifier(name), t.sql_name()))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; parsed.headers.len()].join(", ");

    let tx = store.conn_mut().transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
    tx.execute(&format!("CREATE TABLE {} ({})", table, column_defs), [])?;
    {
        let mut insert =
            tx.prepare(&format!("INSERT INTO {} VALUES ({})", table, placeholders))?;
        for row in &parsed.rows {
            insert.execute(rusqlite::params_from_iter(row.iter()))?;
        }
    }
    tx.commit()
}
