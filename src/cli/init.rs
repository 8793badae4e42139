//! Init command implementation

use colored::Colorize;
use dialoguer::{Confirm, Input, Password, Select, theme::ColorfulTheme};
use secrecy::SecretString;

use crate::cli::GlobalOptions;
use crate::client::{AuthApi, DashboardClient};
use crate::config::{
    Config, DEFAULT_DASHBOARD_URL, DashboardConfig, StorageBackend, StorageConfig, TelegramConfig,
};
use crate::error::Result;

/// Run the interactive setup and write the config file
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let theme = ColorfulTheme::default();
    let existing = Config::load_at(opts.config_ref()).ok();

    println!("{}", "Welcome to otprelay!".bold().green());
    println!("Let's connect your dashboard account and Telegram bot.\n");

    let base_url: String = Input::with_theme(&theme)
        .with_prompt("Dashboard URL")
        .default(
            existing
                .as_ref()
                .map(|c| c.dashboard.base_url.clone())
                .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_string()),
        )
        .interact_text()?;

    let email: String = Input::with_theme(&theme)
        .with_prompt("Dashboard email")
        .interact_text()?;

    let password: String = Password::with_theme(&theme)
        .with_prompt("Dashboard password")
        .interact()?;

    let dashboard = DashboardConfig {
        base_url,
        email,
        password: SecretString::from(password),
    };

    let verify = Confirm::with_theme(&theme)
        .with_prompt("Verify the credentials now?")
        .default(true)
        .interact()?;
    if verify {
        println!("\n{}", "Logging in...".cyan());
        match DashboardClient::new(&dashboard).login().await {
            Ok(_) => println!("{}", "✓ Login successful!".green()),
            Err(err) => println!("{} Login failed: {}", "⚠".yellow(), err),
        }
        println!();
    }

    let bot_token: String = Password::with_theme(&theme)
        .with_prompt("Telegram bot token")
        .interact()?;

    let recipients: String = Input::with_theme(&theme)
        .with_prompt("Recipient chat ids (comma-separated)")
        .interact_text()?;

    let owner_id: String = Input::with_theme(&theme)
        .with_prompt("Owner user id (optional)")
        .allow_empty(true)
        .interact_text()?;

    let updates_url: String = Input::with_theme(&theme)
        .with_prompt("Updates channel URL (optional)")
        .allow_empty(true)
        .interact_text()?;

    let backends = ["sqlite", "json"];
    let backend = match Select::with_theme(&theme)
        .with_prompt("Journal storage")
        .items(&backends)
        .default(0)
        .interact()?
    {
        1 => StorageBackend::Json,
        _ => StorageBackend::Sqlite,
    };

    let config = Config {
        dashboard,
        telegram: TelegramConfig {
            bot_token: SecretString::from(bot_token),
            api_base: existing.as_ref().and_then(|c| c.telegram.api_base.clone()),
        },
        recipients: split_list(&recipients),
        owner_id: non_empty(owner_id),
        updates_url: non_empty(updates_url),
        storage: StorageConfig {
            backend,
            dir: existing.and_then(|c| c.storage.dir),
        },
    };

    if let Err(err) = config.validate() {
        println!("{} {}", "⚠".yellow(), err);
    }

    config.save_at(opts.config_ref())?;

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        config_path.display()
    );

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Show configuration status", "otprelay status".cyan());
    println!("  {} - Check the dashboard login", "otprelay probe".cyan());
    println!("  {} - Start relaying OTPs", "otprelay run".cyan());

    Ok(())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
