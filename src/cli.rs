//! CLI argument parsing module for sqlai
//!
//! This module handles parsing command-line arguments using the clap crate.
//! It defines the command-line interface structure and behavior for the application,
//! enabling users to load CSV files, ask questions in plain English and run SQL.
//!
//! Key features of the CLI:
//! - Flexible file specification with optional table name overrides
//! - Repeatable natural-language requests and raw SQL statements
//! - Model service settings that fall back to environment variables
//! - An explicit policy for generated statements that change data

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::config::{AppConfig, MutationPolicy, DEFAULT_DATABASE};
use crate::llm::{ModelConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

/// Command-line arguments for sqlai
///
/// The work requested on the command line runs in a fixed order: files are
/// loaded, `--sql` statements run, `--query` requests are translated and run,
/// the schema is printed, and finally the interactive shell starts.
#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Ask questions about CSV data in plain English"
)]
pub struct SqlaiArgs {
    /// CSV files to load - format: [table_name=]file_path
    ///
    /// Without an explicit name the table is named after the file, up to its
    /// first dot, with non-word characters removed.
    /// Example: users=data/people.csv or just "data/My Sales.csv"
    #[clap(help = "CSV files to load as [table_name=]file_path")]
    pub files: Vec<String>,

    /// SQLite database file holding the loaded tables
    #[clap(
        short,
        long,
        env = "SQLAI_DATABASE",
        default_value = DEFAULT_DATABASE,
        help = "SQLite database file"
    )]
    pub database: PathBuf,

    /// Raw SQL statements, executed as written
    #[clap(short, long, help = "SQL statement to execute")]
    pub sql: Vec<String>,

    /// Natural-language requests to translate and execute
    #[clap(short, long, help = "Question to translate into SQL and run")]
    pub query: Vec<String>,

    /// Table the requests are about
    #[clap(short, long, help = "Target table for --query")]
    pub table: Option<String>,

    /// Print every table and its columns after the other work is done
    #[clap(long, help = "Print the database schema")]
    pub print_schema: bool,

    /// Start in interactive mode (REPL)
    ///
    /// Type .help in the interactive shell to see available commands.
    #[clap(short, long, help = "Start in interactive mode")]
    pub interactive: bool,

    #[clap(long, env = "SQLAI_MODEL", default_value = DEFAULT_MODEL, help = "Model name")]
    pub model: String,

    #[clap(
        long,
        env = "SQLAI_ENDPOINT",
        default_value = DEFAULT_ENDPOINT,
        help = "OpenAI-compatible API base URL"
    )]
    pub endpoint: String,

    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true, help = "API key for the model service")]
    pub api_key: Option<String>,

    /// Upper bound on one model call, in seconds
    #[clap(
        long,
        env = "SQLAI_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Model call timeout in seconds"
    )]
    pub timeout: u64,

    /// What to do with generated INSERT, UPDATE, DELETE and DDL statements
    #[clap(
        long,
        value_enum,
        default_value_t = MutationPolicy::Confirm,
        help = "Handling of generated statements that change data"
    )]
    pub mutations: MutationPolicy,

    /// Enable verbose diagnostic output
    #[clap(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl SqlaiArgs {
    /// Build the application configuration from the parsed arguments
    pub fn to_config(&self) -> AppConfig {
        let model = ModelConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            timeout: Duration::from_secs(self.timeout),
            ..ModelConfig::default()
        };
        AppConfig::new(self.database.clone(), self.verbose, model, self.mutations)
            .with_target_table(self.table.clone())
    }

    /// Whether any one-shot work or the REPL was requested
    pub fn has_work(&self) -> bool {
        !self.files.is_empty()
            || !self.sql.is_empty()
            || !self.query.is_empty()
            || self.print_schema
            || self.interactive
    }
}

/// Parse command-line arguments into the SqlaiArgs structure
///
/// # Returns
/// * `Ok(SqlaiArgs)` - Command-line arguments successfully parsed
/// * `Err` - Error during argument parsing (handled by clap, usually results in help text display)
pub fn parse_args() -> Result<SqlaiArgs> {
    Ok(SqlaiArgs::parse())
}
