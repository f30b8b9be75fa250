//! Configuration module for sqlai
//!
//! This module provides a centralized configuration structure for the application.
//! It is built once from the command line and environment, then handed to the
//! components that need it rather than read from global state.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::llm::ModelConfig;

/// Default SQLite file used when no database path is given
pub const DEFAULT_DATABASE: &str = "sqlai.db";

/// How model-generated mutating statements are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MutationPolicy {
    /// Execute without asking
    Allow,
    /// Execute only after the user confirms the statement
    #[default]
    Confirm,
    /// Never execute
    Deny,
}

impl fmt::Display for MutationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationPolicy::Allow => "allow",
            MutationPolicy::Confirm => "confirm",
            MutationPolicy::Deny => "deny",
        };
        f.write_str(name)
    }
}

/// Application configuration
///
/// This struct encapsulates all global configuration settings for the application.
/// It is created at startup and passed to components that need access to configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the SQLite store
    database: PathBuf,

    /// Whether to show verbose output
    verbose: bool,

    /// Model service settings
    model: ModelConfig,

    /// Handling of generated INSERT/UPDATE/DELETE/DDL statements
    mutations: MutationPolicy,

    /// Table that natural-language requests target by default
    target_table: Option<String>,
}

impl AppConfig {
    /// Create a new application configuration
    ///
    /// # Arguments
    /// * `database` - Path of the SQLite store
    /// * `verbose` - Whether to show verbose output
    /// * `model` - Model service settings
    /// * `mutations` - Policy for generated mutating statements
    pub fn new(
        database: PathBuf,
        verbose: bool,
        model: ModelConfig,
        mutations: MutationPolicy,
    ) -> Self {
        Self {
            database,
            verbose,
            model,
            mutations,
            target_table: None,
        }
    }

    /// Set the default target table
    pub fn with_target_table(mut self, table: Option<String>) -> Self {
        self.target_table = table;
        self
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn mutations(&self) -> MutationPolicy {
        self.mutations
    }

    pub fn target_table(&self) -> Option<&str> {
        self.target_table.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig::new(
            PathBuf::from(DEFAULT_DATABASE),
            false,
            ModelConfig::default(),
            MutationPolicy::default(),
        )
    }
}
