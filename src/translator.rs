//! Natural-language to SQL translation for sqlai
//!
//! The translator grounds every request in a schema snapshot: the system
//! instruction carries the live table and column list plus worked examples,
//! and the user turn carries the request and the selected table. The model
//! call runs as one async task bounded by a timeout and raced against a
//! cancellation token owned by the caller. Nothing is retried and no
//! fallback query is ever produced.

use std::time::Duration;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::error::{SqlaiError, SqlaiResult};
use crate::llm::{LanguageModel, Message};
use crate::schema::SchemaSnapshot;

/// A validated natural-language request with the schema it targets
#[derive(Debug, Clone)]
pub struct TranslationRequest<'a> {
    text: String,
    schema: &'a SchemaSnapshot,
    target_table: Option<String>,
}

impl<'a> TranslationRequest<'a> {
    /// Build a request
    ///
    /// # Returns
    /// * `Err(EmptyRequest)` if `text` is empty or whitespace
    /// * `Err(TableNotFound)` if `target_table` is not in `schema`
    pub fn new(
        text: &str,
        schema: &'a SchemaSnapshot,
        target_table: Option<&str>,
    ) -> SqlaiResult<Self> {
        validate_request_text(text)?;
        if let Some(table) = target_table {
            if !schema.contains(table) {
                return Err(SqlaiError::TableNotFound(table.to_string()));
            }
        }
        Ok(TranslationRequest {
            text: text.trim().to_string(),
            schema,
            target_table: target_table.map(str::to_string),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn schema(&self) -> &SchemaSnapshot {
        self.schema
    }

    pub fn target_table(&self) -> Option<&str> {
        self.target_table.as_deref()
    }
}

/// Reject empty or whitespace-only request text
pub fn validate_request_text(text: &str) -> SqlaiResult<()> {
    if text.trim().is_empty() {
        return Err(SqlaiError::EmptyRequest);
    }
    Ok(())
}

/// Build the system instruction for `schema`
pub fn build_system_prompt(schema: &SchemaSnapshot) -> String {
    let schema_text = if schema.is_empty() {
        "(no tables)".to_string()
    } else {
        schema.to_string()
    };

    format!(
        "You translate questions written in English into SQLite SQL.\n\
         \n\
         The database schema is listed below, one table per line, as\n\
         table_name(column_name TYPE, ...). Columns appear in definition order.\n\
         \n\
         {}\n\
         \n\
         Rules:\n\
         - Answer with exactly one SQL statement and nothing else.\n\
         - Do not add explanations, comments, markdown, code fences or a 'sql' label.\n\
         - Use only the tables and columns listed above.\n\
         \n\
         Examples, for a table orders(order_id INTEGER, status TEXT, amount REAL):\n\
         Question: How many records are there?\n\
         SELECT COUNT(*) FROM orders;\n\
         Question: Show all orders whose status is SHIPPED.\n\
         SELECT * FROM orders WHERE status = 'SHIPPED';\n\
         Question: Show the orders with an amount greater than 100.\n\
         SELECT * FROM orders WHERE amount > 100;\n\
         Question: Delete every record.\n\
         DELETE FROM orders;\n\
         Question: Drop the table.\n\
         DROP TABLE orders;",
        schema_text
    )
}

/// Build the user turn for `request`
pub fn build_user_prompt(request: &TranslationRequest<'_>) -> String {
    match request.target_table() {
        Some(table) => format!("Table: {}\nQuestion: {}", table, request.text()),
        None => format!("Question: {}", request.text()),
    }
}

/// Translates requests into candidate SQL with a language model
pub struct Translator<M> {
    model: M,
    timeout: Duration,
}

impl<M: LanguageModel> Translator<M> {
    pub fn new(model: M, timeout: Duration) -> Self {
        Translator { model, timeout }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the model for a statement answering `request`
    ///
    /// # Returns
    /// * `Ok(raw)` with the model's unprocessed text
    /// * `Err(TranslationError)` if the call fails or the reply is empty
    /// * `Err(TranslationTimeout)` if the call outlives the timeout
    /// * `Err(TranslationCancelled)` if `cancel` fires first
    pub async fn translate(
        &self,
        request: &TranslationRequest<'_>,
        cancel: &CancellationToken,
    ) -> SqlaiResult<String> {
        let messages = vec![
            Message::system(build_system_prompt(request.schema())),
            Message::user(build_user_prompt(request)),
        ];
        info!(
            "translating request ({} chars, {} tables in schema)",
            request.text().len(),
            request.schema().len()
        );

        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SqlaiError::TranslationCancelled),
            result = tokio::time::timeout(self.timeout, self.model.complete(&messages)) => {
                match result {
                    Ok(reply) => reply?,
                    Err(_) => return Err(SqlaiError::TranslationTimeout(self.timeout.as_secs())),
                }
            }
        };

        if raw.trim().is_empty() {
            return Err(SqlaiError::TranslationError(
                "model returned an empty response".to_string(),
            ));
        }
        debug!("model replied with {} chars", raw.len());
        Ok(raw)
    }
}
