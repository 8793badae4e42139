//! otprelay - relays OTP SMS from a virtual-number dashboard to Telegram chats

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod extract;
mod models;
mod monitor;
mod notify;

use cli::{CacheCommands, Cli, Commands, GlobalOptions};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let opts = GlobalOptions::from_cli(&cli);
    init_logging(opts.debug);

    match cli.command {
        Commands::Run => cli::run::run(&opts).await,
        Commands::Init => cli::init::run(&opts).await,
        Commands::Status => cli::status::run(&opts).await,
        Commands::Probe => cli::probe::run(&opts).await,
        Commands::Parse { message, range } => {
            cli::parse::run(opts.format, &message, range.as_deref())
        }
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts).await,
            CacheCommands::Clear => cli::cache::clear(&opts).await,
            CacheCommands::Prune { older_than_hours } => {
                cli::cache::prune(&opts, older_than_hours).await
            }
        },
    }
}

/// `info` by default, `debug` with --debug; RUST_LOG overrides both.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}
