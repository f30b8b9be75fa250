//! Request pipeline for sqlai
//!
//! A [`Session`] owns the store and threads one natural-language request at a
//! time through validation, schema capture, translation, sanitization,
//! classification, the mutation policy and execution. The schema is read
//! fresh for every request and again after anything that changes it, so no
//! stale snapshot ever reaches the model.

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::MutationPolicy;
use crate::error::{SqlaiError, SqlaiResult};
use crate::executor::{classify, ensure_single_statement, ExecutionResult, QueryExecutor, QueryKind};
use crate::ingest::{DatasetIngestor, IngestReport};
use crate::llm::LanguageModel;
use crate::sanitize::ResponseSanitizer;
use crate::schema::{SchemaInspector, SchemaSnapshot};
use crate::store::Store;
use crate::translator::{validate_request_text, TranslationRequest, Translator};

/// A translated statement waiting to be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    sql: String,
    kind: QueryKind,
    confirmed: bool,
}

impl PreparedQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Whether executing this statement changes the store
    pub fn is_mutating(&self) -> bool {
        !self.kind.is_read()
    }

    /// Mark the statement as approved by the user
    pub fn confirm(mut self) -> Self {
        self.confirmed = true;
        self
    }
}

/// What happened to one executed statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// The statement that ran
    pub sql: String,
    pub result: ExecutionResult,
    /// New schema, present after every committed mutation
    pub refreshed_schema: Option<SchemaSnapshot>,
}

/// One user's working session against a store
pub struct Session<M> {
    store: Store,
    ingestor: DatasetIngestor,
    translator: Translator<M>,
    sanitizer: ResponseSanitizer,
    executor: QueryExecutor,
    policy: MutationPolicy,
}

impl<M: LanguageModel> Session<M> {
    pub fn new(store: Store, translator: Translator<M>, policy: MutationPolicy) -> Self {
        Session {
            store,
            ingestor: DatasetIngestor::new(),
            translator,
            sanitizer: ResponseSanitizer::new(),
            executor: QueryExecutor::new(),
            policy,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn policy(&self) -> MutationPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: MutationPolicy) {
        self.policy = policy;
    }

    pub fn translator(&self) -> &Translator<M> {
        &self.translator
    }

    /// Capture the current schema
    pub fn schema(&self) -> SqlaiResult<SchemaSnapshot> {
        SchemaInspector::snapshot(&self.store)
    }

    /// Load a CSV file and return the report with the schema it produced
    pub fn ingest_file(&mut self, file_spec: &str) -> SqlaiResult<(IngestReport, SchemaSnapshot)> {
        let report = self.ingestor.ingest_file(file_spec, &mut self.store)?;
        let schema = self.schema()?;
        Ok((report, schema))
    }

    /// Translate `text` into a statement without executing it
    ///
    /// Blank text is rejected before the schema is read or the model is
    /// called. A `target_table` missing from the current schema is rejected
    /// before the model is called.
    ///
    /// # Returns
    /// * `Ok(PreparedQuery)` holding sanitized, classified SQL
    /// * `Err(EmptyRequest | TableNotFound | Translation* | SanitizationError)`
    /// * `Err(ExecutionError)` if sanitizing left no statement or more than one
    pub async fn prepare(
        &self,
        text: &str,
        target_table: Option<&str>,
        cancel: &CancellationToken,
    ) -> SqlaiResult<PreparedQuery> {
        validate_request_text(text)?;
        let schema = self.schema()?;
        let request = TranslationRequest::new(text, &schema, target_table)?;

        let raw = self.translator.translate(&request, cancel).await?;
        let sql = self.sanitizer.sanitize(&raw)?.into_string();
        if sql.is_empty() {
            return Err(SqlaiError::ExecutionError(
                "model response contained no SQL statement".to_string(),
            ));
        }
        ensure_single_statement(&sql)?;

        let kind = classify(&sql);
        debug!("prepared {:?} statement: {}", kind, sql);
        Ok(PreparedQuery {
            sql,
            kind,
            confirmed: false,
        })
    }

    /// Execute a prepared statement under the session's mutation policy
    pub fn execute(&mut self, prepared: PreparedQuery) -> SqlaiResult<QueryOutcome> {
        if prepared.is_mutating() {
            match self.policy {
                MutationPolicy::Allow => {}
                MutationPolicy::Confirm if prepared.confirmed => {}
                MutationPolicy::Confirm => {
                    return Err(SqlaiError::MutationNotConfirmed(prepared.sql));
                }
                MutationPolicy::Deny => {
                    warn!("refusing generated mutating statement");
                    return Err(SqlaiError::MutationDenied(prepared.sql));
                }
            }
        }
        self.run(prepared.sql)
    }

    /// Translate and execute in one step
    ///
    /// `confirm` is consulted only for mutating statements under the
    /// `confirm` policy; returning `false` leaves the store untouched.
    pub async fn ask<F>(
        &mut self,
        text: &str,
        target_table: Option<&str>,
        cancel: &CancellationToken,
        confirm: F,
    ) -> SqlaiResult<QueryOutcome>
    where
        F: FnOnce(&PreparedQuery) -> bool,
    {
        let mut prepared = self.prepare(text, target_table, cancel).await?;
        if prepared.is_mutating() && self.policy == MutationPolicy::Confirm && confirm(&prepared) {
            prepared = prepared.confirm();
        }
        self.execute(prepared)
    }

    /// Execute a user-written statement directly
    ///
    /// The statement skips translation and the mutation policy.
    pub fn execute_sql(&mut self, sql: &str) -> SqlaiResult<QueryOutcome> {
        self.run(sql.trim().to_string())
    }

    fn run(&mut self, sql: String) -> SqlaiResult<QueryOutcome> {
        let result = self.executor.execute(&sql, &mut self.store)?;
        let refreshed_schema = match result {
            ExecutionResult::Committed { .. } => {
                info!("store changed, refreshing schema");
                Some(self.schema()?)
            }
            ExecutionResult::Rows(_) => None,
        };
        Ok(QueryOutcome {
            sql,
            result,
            refreshed_schema,
        })
    }
}
