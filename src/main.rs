//! sqlai - ask questions about CSV data in plain English
//!
//! This tool loads CSV files into a SQLite database, asks a language model to
//! translate natural-language questions into SQL against the live schema, and
//! runs the resulting statements.
//!
//! # Program Flow
//!
//! 1. Parse command-line arguments and build the configuration
//! 2. Load the given files, replacing tables of the same name
//! 3. Execute raw `--sql` statements in order
//! 4. Translate and execute `--query` requests in order
//! 5. Print the schema if requested
//! 6. Start the interactive shell if requested

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use sqlai::cli;
use sqlai::config::{AppConfig, MutationPolicy};
use sqlai::executor::ExecutionResult;
use sqlai::llm::ChatModel;
use sqlai::repl::Repl;
use sqlai::session::{PreparedQuery, QueryOutcome, Session};
use sqlai::store::Store;
use sqlai::translator::Translator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args()?;
    let config = args.to_config();

    let _r = env_logger::builder()
        .filter_level(if config.verbose() {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .try_init();

    if !args.has_work() {
        bail!("Nothing to do: pass CSV files, --sql, --query, --print-schema or --interactive (see --help)");
    }

    if config.verbose() {
        println!("Running in verbose mode");
        println!("Database: {}", config.database().display());
        println!("Model: {} at {}", config.model().model, config.model().endpoint);
    }

    let mut session = open_session(&config)?;

    for file_spec in &args.files {
        let (report, _) = session
            .ingest_file(file_spec)
            .with_context(|| format!("Failed to load {file_spec}"))?;
        if config.verbose() {
            println!(
                "Loaded table '{}' ({} columns, {} rows)",
                report.table_name,
                report.columns.len(),
                report.rows
            );
        }
    }

    for sql in &args.sql {
        if config.verbose() {
            println!("Executing SQL: {sql}");
        }
        let outcome = session
            .execute_sql(sql)
            .with_context(|| format!("Failed to execute SQL: {sql}"))?;
        print_outcome(&outcome, &config)?;
    }

    for text in &args.query {
        let cancel = CancellationToken::new();
        let mut prepared = session
            .prepare(text, config.target_table(), &cancel)
            .await
            .with_context(|| format!("Failed to translate: {text}"))?;
        eprintln!("SQL: {}", prepared.sql());

        if prepared.is_mutating() && session.policy() == MutationPolicy::Confirm && confirm_on_stdin(&prepared)? {
            prepared = prepared.confirm();
        }
        let outcome = session
            .execute(prepared)
            .with_context(|| format!("Failed to execute query for: {text}"))?;
        print_outcome(&outcome, &config)?;
    }

    if args.print_schema {
        let schema = session.schema().context("Failed to read schema")?;
        if !schema.is_empty() {
            println!("{schema}");
        }
    }

    if args.interactive {
        let mut repl = Repl::new(session, config.target_table().map(str::to_string), config.verbose())
            .context("Failed to start interactive mode")?;
        repl.run().await.context("Failed to run interactive mode")?;
    }

    Ok(())
}

fn open_session(config: &AppConfig) -> Result<Session<ChatModel>> {
    let store = Store::open(config.database())
        .with_context(|| format!("Failed to open database {}", config.database().display()))?;
    let model = ChatModel::new(config.model().clone()).context("Failed to create model client")?;
    let translator = Translator::new(model, config.model().timeout);
    Ok(Session::new(store, translator, config.mutations()))
}

fn print_outcome(outcome: &QueryOutcome, config: &AppConfig) -> Result<()> {
    match &outcome.result {
        ExecutionResult::Rows(rows) => {
            if config.verbose() {
                println!("Query returned {} rows", rows.row_count());
            }
            rows.print_to_stdout()?;
        }
        ExecutionResult::Committed { rows_affected } => {
            println!("Query executed successfully");
            if config.verbose() {
                println!("{rows_affected} rows affected");
            }
        }
    }
    Ok(())
}

/// Ask on stderr and read a yes/no answer from stdin
fn confirm_on_stdin(prepared: &PreparedQuery) -> Result<bool> {
    eprint!("This statement changes data: {}\nExecute it? [y/N] ", prepared.sql());
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
