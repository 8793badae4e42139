//! Journal management commands

use chrono::{DateTime, Duration, Local, Utc};

use crate::cache::PruneStats;
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::error::Result;

/// Show journal statistics
pub async fn status(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::load(opts)?;
    let journals = ctx.journals().await?;
    let stats = journals.stats();

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "backend": ctx.config.storage.backend,
                "path": journals.location(),
                "messages": stats.messages,
                "numbers": stats.numbers,
                "otp_entries": stats.otp_entries,
                "oldest_entry": stats.oldest.map(|t| t.to_rfc3339()),
                "newest_entry": stats.newest.map(|t| t.to_rfc3339()),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty => {
            println!("Journal Status");
            println!("────────────────────────────────────────");
            println!("Backend:        {:?}", ctx.config.storage.backend);
            println!("Location:       {}", journals.location());
            println!("Messages seen:  {}", stats.messages);
            println!("Codes recorded: {}", stats.otp_entries);
            println!("Numbers:        {}", stats.numbers);

            if let Some(oldest) = stats.oldest {
                println!("Oldest entry:   {}", local_time(oldest));
            }
            if let Some(newest) = stats.newest {
                println!("Newest entry:   {}", local_time(newest));
            }
        }
    }

    Ok(())
}

/// Forget everything
pub async fn clear(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::load(opts)?;
    let removed = match ctx.journals().await {
        Ok(mut journals) => journals.clear().await?,
        // an unreadable journal is exactly what clear is for
        Err(_) => {
            let store = crate::cache::open_store(&ctx.config.storage)?;
            crate::cache::DedupCache::reset(store).await?
        }
    };

    report_removed(ctx.format, removed, "Journals were already empty")
}

/// Drop entries older than `older_than_hours`
pub async fn prune(opts: &GlobalOptions, older_than_hours: u32) -> Result<()> {
    let ctx = CommandContext::load(opts)?;
    let mut journals = ctx.journals().await?;
    let cutoff = Utc::now() - Duration::hours(i64::from(older_than_hours));
    let removed = journals.prune(cutoff).await?;

    report_removed(ctx.format, removed, "Nothing older than the cutoff")
}

fn report_removed(format: OutputFormat, removed: PruneStats, nothing: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "messages_removed": removed.messages_removed,
                "otp_entries_removed": removed.otp_entries_removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty => {
            if removed.messages_removed + removed.otp_entries_removed > 0 {
                println!(
                    "Removed {} messages and {} codes",
                    removed.messages_removed, removed.otp_entries_removed
                );
            } else {
                println!("{nothing}");
            }
        }
    }
    Ok(())
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
