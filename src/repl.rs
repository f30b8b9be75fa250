//! Interactive shell for sqlai
//!
//! Lines starting with `.` are shell commands; anything else is a question
//! that is translated into SQL against the selected table and executed.
//! Ctrl-C while the model is working cancels the request and returns to the
//! prompt.

use std::borrow::Cow;
use std::time::Instant;

use log::debug;
use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{self, Validator};
use rustyline::{Config, Context, Editor, Helper};
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::MutationPolicy;
use crate::error::SqlaiError;
use crate::executor::ExecutionResult;
use crate::llm::LanguageModel;
use crate::session::{QueryOutcome, Session};

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("{0}")]
    Sqlai(#[from] SqlaiError),
    #[error("Input error: {0}")]
    Readline(#[from] ReadlineError),
}

pub type Result<T> = std::result::Result<T, ReplError>;

const HISTORY_FILE: &str = ".sqlai_history";
const PROMPT: &str = "sqlai> ";

const COMMANDS: &[&str] = &[
    ".exit",
    ".help",
    ".load",
    ".mutations",
    ".quit",
    ".schema",
    ".show",
    ".sql",
    ".stats",
    ".tables",
    ".use",
];

/// Command completer for REPL commands
#[derive(Default)]
struct CommandCompleter {
    commands: Vec<String>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        // Only the command word is completed, never its arguments
        if line.starts_with('.') && !line[..pos].contains(' ') {
            let partial = &line[..pos];
            let candidates = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(partial))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((pos, vec![]))
        }
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Highlighter for CommandCompleter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        false
    }
}

impl Validator for CommandCompleter {
    fn validate(
        &self,
        _ctx: &mut validate::ValidationContext,
    ) -> rustyline::Result<validate::ValidationResult> {
        Ok(validate::ValidationResult::Valid(None))
    }
}

impl Helper for CommandCompleter {}

/// Commands that can be executed in the REPL
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    /// Translate and run a question
    Ask(String),
    /// Run a SQL statement as written
    Sql(String),
    /// Load a CSV file into a table
    Load(String),
    /// List tables
    Tables,
    /// Show the schema of one table or all tables
    Schema(Option<String>),
    /// Select or clear the target table
    Use(Option<String>),
    /// Show or change the mutation policy
    Mutations(Option<String>),
    /// Show current settings
    Show,
    /// Toggle timing output
    Stats(Option<String>),
    Help,
    Exit,
    /// Nothing to do
    Empty,
    /// Unknown command or missing argument
    Unknown(String),
}

/// Parse one input line
fn parse_command(input: &str) -> ReplCommand {
    let input = input.trim();

    let Some(stripped) = input.strip_prefix('.') else {
        return if input.is_empty() {
            ReplCommand::Empty
        } else {
            ReplCommand::Ask(input.to_string())
        };
    };

    let parts: Vec<&str> = stripped.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let arg = parts
        .get(1)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match command.as_str() {
        "exit" | "quit" => ReplCommand::Exit,
        "help" => ReplCommand::Help,
        "tables" => ReplCommand::Tables,
        "schema" => ReplCommand::Schema(arg),
        "use" => ReplCommand::Use(arg),
        "show" => ReplCommand::Show,
        "stats" => ReplCommand::Stats(arg),
        "mutations" => ReplCommand::Mutations(arg),
        "load" => match arg {
            Some(spec) => ReplCommand::Load(spec),
            None => ReplCommand::Unknown("File path required for .load command".to_string()),
        },
        "sql" => match arg {
            Some(sql) => ReplCommand::Sql(sql),
            None => ReplCommand::Unknown("SQL statement required for .sql command".to_string()),
        },
        _ => ReplCommand::Unknown(format!("Unknown command: .{}", command)),
    }
}

/// REPL interface for interactive questions
pub struct Repl<M> {
    session: Session<M>,
    editor: Editor<CommandCompleter, DefaultHistory>,
    /// Table questions are asked about
    target_table: Option<String>,
    verbose: bool,
    running: bool,
    show_stats: bool,
}

impl<M: LanguageModel> Repl<M> {
    /// Create a new REPL around `session`
    pub fn new(
        session: Session<M>,
        target_table: Option<String>,
        verbose: bool,
    ) -> Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CommandCompleter::new()));
        if let Err(e) = editor.load_history(HISTORY_FILE) {
            debug!("no history loaded: {}", e);
        }

        Ok(Self {
            session,
            editor,
            target_table,
            verbose,
            running: true,
            show_stats: false,
        })
    }

    /// Run the REPL until `.exit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        println!("Welcome to sqlai interactive mode!");
        println!("Ask a question about your tables, or type .help for commands.");

        while self.running {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    if let Err(e) = self.execute_command(parse_command(&line)).await {
                        eprintln!("Error: {}", e);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        if let Err(e) = self.editor.save_history(HISTORY_FILE) {
            eprintln!("Failed to save history: {}", e);
        }
        Ok(())
    }

    async fn execute_command(&mut self, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::Ask(text) => self.ask(&text).await,
            ReplCommand::Sql(sql) => self.execute_sql(&sql),
            ReplCommand::Load(spec) => self.load_file(&spec),
            ReplCommand::Tables => self.show_tables(),
            ReplCommand::Schema(table) => self.show_schema(table.as_deref()),
            ReplCommand::Use(table) => self.use_table(table),
            ReplCommand::Mutations(policy) => self.set_mutations(policy.as_deref()),
            ReplCommand::Show => self.show_settings(),
            ReplCommand::Stats(option) => {
                self.toggle_stats(option.as_deref());
                Ok(())
            }
            ReplCommand::Help => {
                self.show_help();
                Ok(())
            }
            ReplCommand::Exit => {
                self.running = false;
                Ok(())
            }
            ReplCommand::Empty => Ok(()),
            ReplCommand::Unknown(msg) => {
                eprintln!("{}", msg);
                Ok(())
            }
        }
    }

    /// Translate a question, confirm if needed, and execute it
    async fn ask(&mut self, text: &str) -> Result<()> {
        let start_time = self.show_stats.then(Instant::now);

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let prepared = self
            .session
            .prepare(text, self.target_table.as_deref(), &cancel)
            .await;
        watcher.abort();

        let mut prepared = match prepared {
            Ok(prepared) => prepared,
            Err(SqlaiError::TranslationCancelled) => {
                println!("Request cancelled");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        println!("SQL: {}", prepared.sql());

        if prepared.is_mutating() && self.session.policy() == MutationPolicy::Confirm {
            if !self.confirm()? {
                println!("Statement not executed");
                return Ok(());
            }
            prepared = prepared.confirm();
        }

        let outcome = self.session.execute(prepared)?;
        self.report(outcome);

        if let Some(start_time) = start_time {
            println!("Run Time: {:.3} ms", start_time.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(())
    }

    fn confirm(&mut self) -> Result<bool> {
        match self.editor.readline("This statement changes data. Execute it? [y/N] ") {
            Ok(answer) => Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn execute_sql(&mut self, sql: &str) -> Result<()> {
        let start_time = self.show_stats.then(Instant::now);
        let outcome = self.session.execute_sql(sql)?;
        self.report(outcome);
        if let Some(start_time) = start_time {
            println!("Run Time: {:.3} ms", start_time.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(())
    }

    /// Print an outcome and drop a target table that no longer exists
    fn report(&mut self, outcome: QueryOutcome) {
        match &outcome.result {
            ExecutionResult::Rows(rows) => {
                if rows.is_empty() {
                    println!("Query returned no rows");
                } else {
                    println!("Query returned {} rows", rows.row_count());
                    if let Err(e) = rows.print_to_stdout() {
                        eprintln!("Error: {}", e);
                    }
                }
            }
            ExecutionResult::Committed { rows_affected } => {
                println!("Query executed successfully");
                if self.verbose {
                    println!("{} rows affected", rows_affected);
                }
            }
        }

        if let Some(schema) = outcome.refreshed_schema {
            if let Some(table) = &self.target_table {
                if !schema.contains(table) {
                    println!("Table '{}' no longer exists; no table selected", table);
                    self.target_table = None;
                }
            }
        }
    }

    fn load_file(&mut self, file_spec: &str) -> Result<()> {
        let (report, _) = self.session.ingest_file(file_spec)?;
        println!(
            "Loaded table '{}' ({} columns, {} rows)",
            report.table_name,
            report.columns.len(),
            report.rows
        );
        if self.target_table.is_none() {
            println!("Using table '{}'", report.table_name);
            self.target_table = Some(report.table_name);
        }
        Ok(())
    }

    fn show_tables(&self) -> Result<()> {
        let schema = self.session.schema()?;
        if schema.is_empty() {
            println!("No tables loaded");
            return Ok(());
        }
        println!("Tables:");
        for name in schema.table_names() {
            let marker = if self.target_table.as_deref() == Some(name) {
                " (selected)"
            } else {
                ""
            };
            println!("  {}{}", name, marker);
        }
        Ok(())
    }

    fn show_schema(&self, table_name: Option<&str>) -> Result<()> {
        let schema = self.session.schema()?;
        match table_name {
            Some(name) => match schema.table(name) {
                Some(table) => println!("{}", table),
                None => return Err(SqlaiError::TableNotFound(name.to_string()).into()),
            },
            None if schema.is_empty() => println!("No tables loaded"),
            None => println!("{}", schema),
        }
        Ok(())
    }

    fn use_table(&mut self, table: Option<String>) -> Result<()> {
        match table {
            Some(name) => {
                if !self.session.schema()?.contains(&name) {
                    return Err(SqlaiError::TableNotFound(name).into());
                }
                println!("Using table '{}'", name);
                self.target_table = Some(name);
            }
            None => {
                self.target_table = None;
                println!("No table selected");
            }
        }
        Ok(())
    }

    fn set_mutations(&mut self, policy: Option<&str>) -> Result<()> {
        use clap::ValueEnum;

        match policy {
            None => println!("Mutations: {}", self.session.policy()),
            Some(value) => match MutationPolicy::from_str(value, true) {
                Ok(policy) => {
                    self.session.set_policy(policy);
                    println!("Mutations: {}", policy);
                }
                Err(_) => {
                    println!("Unknown option for .mutations");
                    println!("Usage: .mutations [allow|confirm|deny]");
                }
            },
        }
        Ok(())
    }

    fn show_settings(&self) -> Result<()> {
        let schema = self.session.schema()?;
        println!("sqlai Settings:");
        match self.session.store().path() {
            Some(path) => println!("  Database:     {}", path.display()),
            None => println!("  Database:     (in memory)"),
        }
        println!(
            "  Table:        {}",
            self.target_table.as_deref().unwrap_or("(none)")
        );
        println!("  Mutations:    {}", self.session.policy());
        println!(
            "  Timeout:      {} s",
            self.session.translator().timeout().as_secs()
        );
        println!("  Statistics:   {}", if self.show_stats { "ON" } else { "OFF" });
        println!("  Tables Loaded: {}", schema.len());
        Ok(())
    }

    fn toggle_stats(&mut self, option: Option<&str>) {
        match option {
            Some("on") => self.show_stats = true,
            Some("off") => self.show_stats = false,
            None => self.show_stats = !self.show_stats,
            Some(_) => {
                println!("Unknown option for .stats");
                println!("Usage: .stats [on|off]");
                return;
            }
        }
        println!(
            "Statistics display {}",
            if self.show_stats { "enabled" } else { "disabled" }
        );
    }

    fn show_help(&self) {
        println!("Available commands:");
        println!("  .exit                 Exit the REPL");
        println!("  .help                 Show this help message");
        println!("  .load [TABLE=]FILE    Load a CSV FILE into TABLE and select it");
        println!(
            "  .mutations [POLICY]   Show or set allow|confirm|deny (currently: {})",
            self.session.policy()
        );
        println!("  .quit                 Exit the REPL");
        println!("  .schema ?TABLE?       Show columns of TABLE or of every table");
        println!("  .show                 Show current settings");
        println!("  .sql STATEMENT        Execute STATEMENT as written");
        println!(
            "  .stats [on|off]       Toggle timing display (currently: {})",
            if self.show_stats { "ON" } else { "OFF" }
        );
        println!("  .tables               List tables");
        println!("  .use ?TABLE?          Select the table questions are about");
        println!("  QUESTION              Translate QUESTION into SQL and run it");
    }
}
