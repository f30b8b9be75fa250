//! sqlai library crate
//!
//! This is the library component of sqlai, containing the natural-language
//! to SQL pipeline behind the command-line tool. The library provides:
//!
//! - CSV ingestion into a SQLite store with type inference and replace semantics
//! - Point-in-time schema snapshots of the store
//! - Translation of questions into SQL with an OpenAI-compatible chat model,
//!   bounded by a timeout and cancellable
//! - Cleanup of model output down to the bare statement
//! - Classification and execution of statements, with transactional commits
//!   for anything that changes data
//! - A session that ties the stages together under a mutation policy
//! - An interactive shell

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod ingest;
pub mod llm;
pub mod repl;
pub mod sanitize;
pub mod schema;
pub mod session;
pub mod store;
pub mod table;
pub mod translator;
