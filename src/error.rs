//! Error handling for sqlai
//!
//! This module defines the error type shared by every stage of the
//! request pipeline: ingestion, schema introspection, translation,
//! sanitization and execution. Each stage reports failures through its own
//! variant so the caller can tell where a request stopped.
//!
//! The module uses thiserror to keep the variants and their messages in one place.

use thiserror::Error;

/// SqlaiError represents all possible errors that can occur in sqlai
///
/// Messages are written to be shown to the end user unchanged. Errors coming
/// from the SQL engine or the model service carry the underlying diagnostic
/// verbatim.
#[derive(Error, Debug)]
pub enum SqlaiError {
    /// Error during file system operations outside of ingestion parsing
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Uploaded content could not be read, decoded or parsed into a table
    #[error("Ingestion error: {0}")]
    IngestionError(String),

    /// The store's tables or columns could not be enumerated
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The model service failed or returned nothing usable
    #[error("Translation error: {0}")]
    TranslationError(String),

    /// The model service did not answer within the configured bound
    #[error("Translation error: model did not respond within {0} seconds")]
    TranslationTimeout(u64),

    /// The caller cancelled the translation while it was in flight
    #[error("Translation cancelled")]
    TranslationCancelled,

    /// The model output could not be processed as text at all
    #[error("Sanitization error: {0}")]
    SanitizationError(String),

    /// The store rejected the statement; nothing was committed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// A natural-language request was empty or whitespace only
    #[error("Please enter a valid query: the request is empty")]
    EmptyRequest,

    /// A referenced table is not part of the current schema
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// A generated mutating statement was refused by the mutation policy
    #[error("Mutating statements are disabled: {0}")]
    MutationDenied(String),

    /// A generated mutating statement was not confirmed by the user
    #[error("Mutating statement was not confirmed: {0}")]
    MutationNotConfirmed(String),
}

/// Result type alias for operations that can produce a SqlaiError
pub type SqlaiResult<T> = std::result::Result<T, SqlaiError>;
