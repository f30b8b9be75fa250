//! SQL execution module for sqlai
//!
//! This module classifies a sanitized statement as a read or a mutation and
//! runs it against the store.
//!
//! Reads return their rows. Mutations run in a transaction that is committed
//! on success and rolled back on failure; they return only a commit signal,
//! and the caller is expected to take a new schema snapshot afterwards.

use log::{debug, info};
use rusqlite::Connection;
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::{SqlaiError, SqlaiResult};
use crate::store::Store;
use crate::table::{ResultSet, Value};

/// Whether a statement only retrieves data or changes the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Pure retrieval
    Read,
    /// INSERT, UPDATE, DELETE, DDL and anything else that is not a query
    Mutating,
}

impl QueryKind {
    pub fn is_read(&self) -> bool {
        matches!(self, QueryKind::Read)
    }
}

/// Result of executing one statement
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Rows of a read statement, possibly none
    Rows(ResultSet),
    /// A mutating statement was committed
    ///
    /// The store's structure or contents changed: any schema snapshot or
    /// rendered view taken before this point is stale.
    Committed {
        /// Change count reported by the engine
        rows_affected: usize,
    },
}

/// Classify a statement as [`QueryKind::Read`] or [`QueryKind::Mutating`]
///
/// The statement is parsed first; a lone query statement (SELECT, WITH,
/// VALUES) is a read and every other statement mutates. Text the parser
/// does not understand is classified by its leading keyword.
pub fn classify(sql: &str) -> QueryKind {
    match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) if statements.len() == 1 => match statements[0] {
            Statement::Query(_) => QueryKind::Read,
            _ => QueryKind::Mutating,
        },
        Ok(statements) if statements.is_empty() => classify_by_keyword(sql),
        Ok(_) => QueryKind::Mutating,
        Err(e) => {
            debug!("parser rejected statement ({}), classifying by keyword", e);
            classify_by_keyword(sql)
        }
    }
}

fn classify_by_keyword(sql: &str) -> QueryKind {
    let keyword = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    match keyword.as_str() {
        "SELECT" | "WITH" | "VALUES" => QueryKind::Read,
        _ => QueryKind::Mutating,
    }
}

/// Reject text that holds more than one statement
///
/// The engine prepares only the first statement of a batch, so a trailing
/// statement would be silently skipped or, for mutations, run unclassified.
/// Separators inside string literals and trailing comments do not count.
pub fn ensure_single_statement(sql: &str) -> SqlaiResult<()> {
    let count = match Tokenizer::new(&SQLiteDialect {}, sql).tokenize() {
        Ok(tokens) => count_statements(&tokens),
        Err(e) => {
            debug!("tokenizer rejected statement ({}), counting parsed statements", e);
            Parser::parse_sql(&SQLiteDialect {}, sql)
                .map(|statements| statements.len())
                .unwrap_or(1)
        }
    };
    if count > 1 {
        return Err(SqlaiError::ExecutionError(format!(
            "only one statement can be executed at a time, found {}",
            count
        )));
    }
    Ok(())
}

fn count_statements(tokens: &[Token]) -> usize {
    let mut count = 0;
    let mut in_statement = false;
    for token in tokens {
        match token {
            Token::SemiColon => in_statement = false,
            Token::Whitespace(_) | Token::EOF => {}
            _ => {
                if !in_statement {
                    count += 1;
                    in_statement = true;
                }
            }
        }
    }
    count
}

/// Executes sanitized statements against the store
#[derive(Debug, Default)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        QueryExecutor
    }

    /// Classify and execute one statement
    ///
    /// # Returns
    /// * `Ok(ExecutionResult::Rows)` for reads
    /// * `Ok(ExecutionResult::Committed)` for committed mutations
    /// * `Err(ExecutionError)` with the engine's message, or for text holding
    ///   several statements; nothing is committed
    pub fn execute(&self, sql: &str, store: &mut Store) -> SqlaiResult<ExecutionResult> {
        if sql.trim().is_empty() {
            return Err(SqlaiError::ExecutionError(
                "no SQL statement to execute".to_string(),
            ));
        }
        ensure_single_statement(sql)?;

        let kind = classify(sql);
        debug!("executing {:?} statement: {}", kind, sql);

        let result = match kind {
            QueryKind::Read => query_rows(store.conn(), sql).map(ExecutionResult::Rows),
            QueryKind::Mutating => {
                commit_statement(store.conn_mut(), sql).map(|rows_affected| {
                    ExecutionResult::Committed { rows_affected }
                })
            }
        };

        let result = result.map_err(|e| SqlaiError::ExecutionError(e.to_string()))?;
        match &result {
            ExecutionResult::Rows(rows) => info!("query returned {} rows", rows.row_count()),
            ExecutionResult::Committed { rows_affected } => {
                info!("statement committed ({} rows affected)", rows_affected)
            }
        }
        Ok(result)
    }
}

fn query_rows(conn: &Connection, sql: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let values = (0..column_count)
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.push(values);
    }

    Ok(ResultSet { columns, rows })
}

fn commit_statement(conn: &mut Connection, sql: &str) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    let rows_affected = tx.execute(sql, [])?;
    tx.commit()?;
    Ok(rows_affected)
}
