//! Probe command: check credentials and listing without sending anything

use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::client::{DashboardApi, SessionManager};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct RangeListing {
    range: String,
    declared: u32,
    numbers: Vec<String>,
}

/// Log in once and list every range with its numbers.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::load(opts)?;
    let dashboard = ctx.dashboard()?;

    if ctx.format == OutputFormat::Pretty {
        println!("{}", "Logging in...".cyan());
    }
    let listings = probe(dashboard).await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
        OutputFormat::Pretty => {
            println!("{}", "✓ Login successful".green());
            if listings.is_empty() {
                println!("{} No ranges with received messages", "○".dimmed());
            }
            for listing in &listings {
                println!(
                    "\n{} ({} declared, {} listed)",
                    listing.range.bold(),
                    listing.declared,
                    listing.numbers.len()
                );
                for number in &listing.numbers {
                    println!("  {number}");
                }
            }
        }
    }
    Ok(())
}

async fn probe<A: DashboardApi + ?Sized>(api: Arc<A>) -> Result<Vec<RangeListing>> {
    let mut sessions = SessionManager::new(api.clone());
    let session = sessions.ensure_logged_in().await?;

    let mut listings = Vec::new();
    for range in api.list_ranges(&session).await? {
        let numbers = api.list_numbers(&session, &range).await?;
        listings.push(RangeListing {
            range: range.label,
            declared: range.count,
            numbers,
        });
    }
    Ok(listings)
}
