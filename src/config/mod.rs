//! Configuration management for otprelay

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Default dashboard host
pub const DEFAULT_DASHBOARD_URL: &str = "https://www.ivasms.com";

/// Default Telegram Bot API host
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source dashboard connection and credentials
    pub dashboard: DashboardConfig,

    /// Telegram bot used as the messaging transport
    pub telegram: TelegramConfig,

    /// Chat ids that receive OTP notifications
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Owner identity, also greeted by the start-up announcement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Link shown on the "Updates Channel" button
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates_url: Option<String>,

    /// Where the dedup journals live
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Dashboard endpoint and login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_url")]
    pub base_url: String,

    #[serde(default)]
    pub email: String,

    #[serde(default = "empty_secret", serialize_with = "serialize_secret")]
    pub password: SecretString,
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "empty_secret", serialize_with = "serialize_secret")]
    pub bot_token: SecretString,

    /// Bot API host override (used by tests and self-hosted API servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Journal backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
}

/// Journal storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory holding the journals (defaults to the platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_dashboard_url() -> String {
    DEFAULT_DASHBOARD_URL.to_string()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn serialize_secret<S: serde::Serializer>(
    secret: &SecretString,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_dashboard_url(),
            email: String::new(),
            password: empty_secret(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: empty_secret(),
            api_base: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dashboard: DashboardConfig::default(),
            telegram: TelegramConfig::default(),
            recipients: Vec::new(),
            owner_id: None,
            updates_url: None,
            storage: StorageConfig::default(),
        }
    }
}

impl TelegramConfig {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_TELEGRAM_API)
    }
}

impl StorageConfig {
    /// Resolve the journal directory (~/.local/share/otprelay on Linux)
    pub fn resolve_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir().ok_or(ConfigError::Invalid(
            "Could not determine data directory".to_string(),
        ))?;
        Ok(base.join("otprelay"))
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".otprelay").join("config.yaml"))
    }

    /// Resolve an optional override into a concrete path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional override path
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to an optional override path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(&Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Credentials live in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Validate everything the poll loop needs before it starts
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.email.trim().is_empty()
            || self.dashboard.password.expose_secret().is_empty()
        {
            return Err(ConfigError::MissingCredentials.into());
        }
        if self.telegram.bot_token.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("telegram.bot_token is empty".to_string()).into());
        }
        if self.recipients.is_empty() {
            return Err(ConfigError::MissingRecipients.into());
        }
        if reqwest::Url::parse(&self.dashboard.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "dashboard.base_url is not a URL: {}",
                self.dashboard.base_url
            ))
            .into());
        }
        Ok(())
    }

    /// Validate only what a dashboard-only command needs
    pub fn validate_dashboard(&self) -> Result<()> {
        if self.dashboard.email.trim().is_empty()
            || self.dashboard.password.expose_secret().is_empty()
        {
            return Err(ConfigError::MissingCredentials.into());
        }
        Ok(())
    }
}
