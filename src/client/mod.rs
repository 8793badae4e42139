//! SMS dashboard client

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

pub mod api;
pub mod dashboard;
pub mod fetch;
#[cfg(test)]
pub mod fixtures;
pub mod html;
#[cfg(test)]
pub mod mock;
pub mod parallel;
pub mod rate_limit;
pub mod session;

pub use api::{AuthApi, DetailApi, ListingApi};
pub use dashboard::DashboardClient;
#[cfg(test)]
pub use mock::MockDashboardClient;
pub use session::SessionManager;

/// Sessions older than this are re-established before the next cycle
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(1800);

/// Full dashboard API combining all sub-traits.
///
/// Any type implementing all three sub-traits automatically implements
/// `DashboardApi` via the blanket impl below.
pub trait DashboardApi: AuthApi + ListingApi + DetailApi {}

impl<T: AuthApi + ListingApi + DetailApi> DashboardApi for T {}

/// An authenticated dashboard session.
///
/// Carries the cookie-bearing HTTP client and the anti-forgery token that
/// every listing call must echo back.
#[derive(Clone)]
pub struct Session {
    http: reqwest::Client,
    token: SecretString,
    established_at: Instant,
}

impl Session {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: SecretString::from(token.into()),
            established_at: Instant::now(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn age(&self) -> Duration {
        self.established_at.elapsed()
    }

    pub fn is_stale(&self) -> bool {
        self.age() >= SESSION_MAX_AGE
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("age", &self.age())
            .finish()
    }
}
