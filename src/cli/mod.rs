//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod cache;
pub mod context;
pub mod init;
pub mod parse;
pub mod probe;
pub mod run;
pub mod status;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// otprelay - relay OTP SMS from a virtual-number dashboard to Telegram
#[derive(Parser, Debug)]
#[command(name = "otprelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, json)
    #[arg(
        long,
        global = true,
        env = "OTPRELAY_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "OTPRELAY_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "OTPRELAY_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the dashboard and relay new OTPs until interrupted
    Run,

    /// Interactively create the configuration file
    Init,

    /// Show configuration and journal status
    Status,

    /// Log in once and list ranges and numbers without sending anything
    Probe,

    /// Run OTP, service and country extraction on a message
    #[command(after_help = "\
Examples:
  otprelay parse \"Your WhatsApp code is 739201\" --range \"Brazil Main\"
  otprelay parse \"G-482913 is your Google verification code\" --format json")]
    Parse {
        /// SMS body to analyse
        message: String,

        /// Range label the message arrived on
        #[arg(long)]
        range: Option<String>,
    },

    /// Inspect or reset the dedup journals
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Journal management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show journal statistics
    Status,
    /// Forget every recorded message and code
    Clear,
    /// Drop entries older than the given age
    Prune {
        /// Age threshold in hours
        #[arg(long)]
        older_than_hours: u32,
    },
}
