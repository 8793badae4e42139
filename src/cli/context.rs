//! Command execution context
//!
//! Loads the configuration once and hands commands the pieces they build on:
//! the dashboard client, the Telegram transport and the dedup journals.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{self, DedupCache};
use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::DashboardClient;
use crate::config::Config;
use crate::error::Result;
use crate::notify::TelegramTransport;

/// Loaded configuration plus runtime options.
pub struct CommandContext {
    pub config: Config,
    /// Where `config` was read from
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load the configuration without validating it.
    ///
    /// # Errors
    /// Returns `ConfigError::NotFound` when no file exists at the resolved path.
    pub fn load(opts: &GlobalOptions) -> Result<Self> {
        let config_path = Config::resolve_path(opts.config_ref())?;
        let config = Config::load_from(&config_path)?;
        Ok(Self {
            config,
            config_path,
            format: opts.format,
        })
    }

    pub fn dashboard(&self) -> Result<Arc<DashboardClient>> {
        self.config.validate_dashboard()?;
        Ok(Arc::new(DashboardClient::new(&self.config.dashboard)))
    }

    pub fn transport(&self) -> Result<Arc<TelegramTransport>> {
        Ok(Arc::new(TelegramTransport::new(&self.config.telegram)?))
    }

    /// Open the configured journal backend and load both journals.
    pub async fn journals(&self) -> Result<DedupCache> {
        let store = cache::open_store(&self.config.storage)?;
        DedupCache::load(store).await
    }
}
