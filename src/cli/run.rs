//! Run command: the long-lived poll loop

use log::{info, warn};

use crate::cli::{CommandContext, GlobalOptions};
use crate::error::Result;
use crate::monitor::{Announcement, Monitor};
use crate::notify::Dispatcher;

/// Start monitoring and relay OTPs until Ctrl-C.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::load(opts)?;
    ctx.config.validate()?;

    let dashboard = ctx.dashboard()?;
    let transport = ctx.transport()?;
    let journals = ctx.journals().await?;
    info!(
        "Loaded {} known messages from {}",
        journals.stats().messages,
        journals.location()
    );

    let dispatcher = Dispatcher::new(transport, ctx.config.recipients.clone());
    let monitor = Monitor::new(dashboard, dispatcher, journals).with_announcement(Announcement {
        owner_id: ctx.config.owner_id.clone(),
        updates_url: ctx.config.updates_url.clone(),
    });

    info!(
        "Relaying OTPs from {} to {} recipients",
        ctx.config.dashboard.base_url,
        ctx.config.recipients.len()
    );
    monitor
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
