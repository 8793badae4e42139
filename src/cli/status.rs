//! Status command implementation

use colored::Colorize;
use secrecy::ExposeSecret;

use crate::cli::{CommandContext, GlobalOptions};
use crate::config::Config;
use crate::error::Result;

/// Display configuration and journal status
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "otprelay Configuration Status".bold());

    let ctx = match CommandContext::load(opts) {
        Ok(ctx) => ctx,
        Err(_) => {
            println!("{} Configuration not found", "✗".red());
            println!();
            println!(
                "Run {} to create a configuration file.",
                "otprelay init".cyan()
            );
            println!();
            return Ok(());
        }
    };
    let config = &ctx.config;

    println!(
        "Config file: {}",
        ctx.config_path.display().to_string().cyan()
    );
    println!("Dashboard:   {}", config.dashboard.base_url);
    println!();

    if config.validate_dashboard().is_ok() {
        println!(
            "{} Dashboard credentials configured ({})",
            "✓".green(),
            config.dashboard.email
        );
    } else {
        println!("{} Dashboard credentials not configured", "✗".red());
        println!("  → Run 'otprelay init' to configure");
    }

    if config.telegram.bot_token.expose_secret().is_empty() {
        println!("{} Telegram bot token not configured", "✗".red());
    } else {
        println!("{} Telegram bot token configured", "✓".green());
    }

    if config.recipients.is_empty() {
        println!("{} No recipients configured", "✗".red());
    } else {
        println!(
            "{} {} recipient(s): {}",
            "✓".green(),
            config.recipients.len(),
            config.recipients.join(", ")
        );
    }

    match &config.owner_id {
        Some(owner) => println!("{} Owner: {}", "✓".green(), owner),
        None => println!("{} No owner set", "○".dimmed()),
    }

    if let Some(api_base) = &config.telegram.api_base {
        println!("{} Custom Bot API host: {}", "○".dimmed(), api_base.cyan());
    }

    println!();
    print_journal_summary(config, &ctx).await;
    println!();

    Ok(())
}

async fn print_journal_summary(config: &Config, ctx: &CommandContext) {
    match ctx.journals().await {
        Ok(journals) => {
            let stats = journals.stats();
            println!(
                "{} Journals ({:?}): {} messages, {} codes across {} numbers",
                "✓".green(),
                config.storage.backend,
                stats.messages,
                stats.otp_entries,
                stats.numbers
            );
            println!("  {}", journals.location().dimmed());
        }
        Err(err) => {
            println!("{} Journals unreadable: {}", "⚠".yellow(), err);
            println!("  → Run 'otprelay cache clear' to reset them");
        }
    }
}
