//! Authentication API trait

use async_trait::async_trait;

use crate::client::Session;
use crate::error::Result;

/// Session establishment for the dashboard
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Perform one login attempt and return a fresh session.
    ///
    /// Retrying is the caller's concern.
    async fn login(&self) -> Result<Session>;
}
