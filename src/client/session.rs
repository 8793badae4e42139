//! Session lifecycle
//!
//! Owns the current dashboard session and decides when it has to be
//! re-established: on first use, once it reaches [`SESSION_MAX_AGE`], or
//! after a call reported an authentication failure.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::{AuthApi, SESSION_MAX_AGE, Session};
use crate::error::{ApiError, Result};

/// Bounded login retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

pub struct SessionManager<A: AuthApi + ?Sized> {
    api: Arc<A>,
    policy: LoginPolicy,
    current: Option<Session>,
}

impl<A: AuthApi + ?Sized> SessionManager<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::with_policy(api, LoginPolicy::default())
    }

    pub fn with_policy(api: Arc<A>, policy: LoginPolicy) -> Self {
        Self {
            api,
            policy,
            current: None,
        }
    }

    /// Return a usable session, logging in again when needed.
    pub async fn ensure_logged_in(&mut self) -> Result<Session> {
        if let Some(session) = &self.current {
            if !session.is_stale() {
                return Ok(session.clone());
            }
            info!(
                "Session reached {}s, re-authenticating",
                SESSION_MAX_AGE.as_secs()
            );
        }

        // A stale or rejected session is never handed out again
        self.current = None;
        let session = self.login_with_retry().await?;
        self.current = Some(session.clone());
        Ok(session)
    }

    /// Drop the current session after an authentication failure.
    pub fn invalidate(&mut self) {
        if self.current.take().is_some() {
            debug!("Dashboard session invalidated");
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the next `ensure_logged_in` will have to log in.
    pub fn needs_login(&self) -> bool {
        self.current.as_ref().is_none_or(Session::is_stale)
    }

    async fn login_with_retry(&self) -> Result<Session> {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.api.login().await {
                Ok(session) => {
                    info!("Logged in to dashboard");
                    return Ok(session);
                }
                Err(err) => {
                    warn!("Login attempt {}/{} failed: {}", attempt, attempts, err);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        error!("Giving up on login after {} attempts", attempts);
        Err(ApiError::LoginExhausted { attempts }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockDashboardClient;
    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn test_login_succeeds_after_retries() {
        let mock = Arc::new(MockDashboardClient::new().with_failing_logins(2).await);
        let mut manager = SessionManager::new(mock.clone());

        let started = tokio::time::Instant::now();
        let session = manager.ensure_logged_in().await.unwrap();

        assert_eq!(session.token(), "mock-token-3");
        assert_eq!(mock.call_counts().await.login, 3);
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_exhausted_after_three_attempts() {
        let mock = Arc::new(MockDashboardClient::new().with_failing_logins(5).await);
        let mut manager = SessionManager::new(mock.clone());

        let err = manager.ensure_logged_in().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Api(ApiError::LoginExhausted { attempts: 3 })
        ));
        assert_eq!(mock.call_counts().await.login, 3);
        assert!(!manager.is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_reused_until_stale() {
        let mock = Arc::new(MockDashboardClient::new());
        let mut manager = SessionManager::new(mock.clone());

        assert!(manager.needs_login());
        manager.ensure_logged_in().await.unwrap();
        manager.ensure_logged_in().await.unwrap();
        assert_eq!(mock.call_counts().await.login, 1);
        assert!(!manager.needs_login());

        tokio::time::advance(SESSION_MAX_AGE).await;
        assert!(manager.needs_login());
        let refreshed = manager.ensure_logged_in().await.unwrap();
        assert_eq!(refreshed.token(), "mock-token-2");
        assert_eq!(mock.call_counts().await.login, 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_login() {
        let mock = Arc::new(MockDashboardClient::new());
        let mut manager = SessionManager::new(mock.clone());

        manager.ensure_logged_in().await.unwrap();
        manager.invalidate();
        assert!(!manager.is_logged_in());

        let session = manager.ensure_logged_in().await.unwrap();
        assert_eq!(session.token(), "mock-token-2");
    }
}
