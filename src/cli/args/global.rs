//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// Precedence is CLI flag > environment variable > default; the config file
/// itself is only read by `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (pretty, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.otprelay/config.yaml)
    pub config: Option<String>,

    /// Verbose logging
    pub debug: bool,
}

impl GlobalOptions {
    /// Called once in main.rs after parsing.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            debug: cli.debug,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }
}
