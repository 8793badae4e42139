//! Error types for otprelay

use std::time::Duration;
use thiserror::Error;

/// Result type alias for otprelay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Errors talking to the SMS dashboard
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Dashboard session is not authenticated")]
    Unauthorized,

    #[error("Dashboard rate limit exceeded (429)")]
    RateLimited,

    #[error("Anti-forgery token not found in {0}")]
    MissingToken(String),

    #[error("Dashboard rejected the login: {0}")]
    LoginRejected(String),

    #[error("Login failed after {attempts} attempts")]
    LoginExhausted { attempts: u32 },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid dashboard response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to dashboard".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Errors raised by the messaging transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Flood wait: retry after {0:?}")]
    FloodWait(Duration),

    #[error("Cannot write to recipient {0}")]
    WriteForbidden(String),

    #[error("Unknown recipient {0}")]
    UnknownRecipient(String),

    #[error("Transport network error: {0}")]
    Network(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Network("Request timed out".to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Journal persistence errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not determine a data directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt cache document {name}: {reason}")]
    Corrupt { name: String, reason: String },
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `otprelay init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Dashboard credentials not configured. Run `otprelay init`.")]
    MissingCredentials,

    #[error("No notification recipients configured")]
    MissingRecipients,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
