//! Mock dashboard client for testing
//!
//! Provides a scripted implementation of the API traits so the session
//! manager and poll loop can be tested without a dashboard.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::api::{AuthApi, DetailApi, ListingApi};
use super::Session;
use crate::error::{ApiError, Result};
use crate::models::{Range, RawMessage};

/// Mock API client for testing.
///
/// Configure expected responses via builder methods, then use in tests.
///
/// # Example
/// ```ignore
/// let mock = MockDashboardClient::new()
///     .with_range(Range::new("Brazil Main", 1), vec!["+551199990000"])
///     .await
///     .with_message("+551199990000", "Your WhatsApp code is 739201")
///     .await;
/// ```
#[derive(Default)]
pub struct MockDashboardClient {
    /// Ranges to return from list_ranges
    ranges: Arc<Mutex<Vec<Range>>>,
    /// Range label -> numbers
    numbers: Arc<Mutex<HashMap<String, Vec<String>>>>,
    /// Number -> latest message body
    messages: Arc<Mutex<HashMap<String, String>>>,
    /// Logins that fail before one succeeds
    failing_logins: Arc<Mutex<u32>>,
    /// Error to return on the next listing call - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Scripted errors per number, consumed in order
    detail_errors: Arc<Mutex<HashMap<String, VecDeque<ApiError>>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
}

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub login: usize,
    pub list_ranges: usize,
    pub list_numbers: usize,
    pub fetch_detail: usize,
}

impl MockDashboardClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range holding the given numbers.
    pub async fn with_range(self, range: Range, numbers: Vec<&str>) -> Self {
        self.numbers.lock().await.insert(
            range.label.clone(),
            numbers.into_iter().map(str::to_string).collect(),
        );
        self.ranges.lock().await.push(range);
        self
    }

    /// Set the latest message served for a number.
    pub async fn with_message(self, number: &str, message: &str) -> Self {
        self.set_message(number, message).await;
        self
    }

    /// Make the next `count` logins fail with a rejection.
    pub async fn with_failing_logins(self, count: u32) -> Self {
        *self.failing_logins.lock().await = count;
        self
    }

    /// Configure an error to return on the next listing call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Queue errors for a number's detail fetches, returned before any success.
    pub async fn with_detail_errors(self, number: &str, errors: Vec<ApiError>) -> Self {
        self.push_detail_errors(number, errors).await;
        self
    }

    /// Queue errors on a client that is already shared.
    pub async fn push_detail_errors(&self, number: &str, errors: Vec<ApiError>) {
        self.detail_errors
            .lock()
            .await
            .entry(number.to_string())
            .or_default()
            .extend(errors);
    }

    /// Replace a number's message mid-test.
    pub async fn set_message(&self, number: &str, message: &str) {
        self.messages
            .lock()
            .await
            .insert(number.to_string(), message.to_string());
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    async fn check_error(&self) -> Result<()> {
        let mut error = self.error.lock().await;
        if let Some(e) = error.take() {
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl AuthApi for MockDashboardClient {
    async fn login(&self) -> Result<Session> {
        let attempt = {
            let mut counts = self.call_count.lock().await;
            counts.login += 1;
            counts.login
        };

        let mut failing = self.failing_logins.lock().await;
        if *failing > 0 {
            *failing -= 1;
            return Err(ApiError::LoginRejected("mock rejection".to_string()).into());
        }

        Ok(Session::new(
            reqwest::Client::new(),
            format!("mock-token-{attempt}"),
        ))
    }
}

#[async_trait]
impl ListingApi for MockDashboardClient {
    async fn list_ranges(&self, _session: &Session) -> Result<Vec<Range>> {
        self.call_count.lock().await.list_ranges += 1;
        self.check_error().await?;
        Ok(self.ranges.lock().await.clone())
    }

    async fn list_numbers(&self, _session: &Session, range: &Range) -> Result<Vec<String>> {
        self.call_count.lock().await.list_numbers += 1;
        self.check_error().await?;
        Ok(self
            .numbers
            .lock()
            .await
            .get(&range.label)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl DetailApi for MockDashboardClient {
    async fn fetch_detail(
        &self,
        _session: &Session,
        number: &str,
        range: &Range,
    ) -> Result<RawMessage> {
        self.call_count.lock().await.fetch_detail += 1;

        let scripted = self
            .detail_errors
            .lock()
            .await
            .get_mut(number)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error.into());
        }

        let messages = self.messages.lock().await;
        Ok(match messages.get(number) {
            Some(message) => RawMessage {
                number: number.to_string(),
                range: range.label.clone(),
                message: message.clone(),
                service: crate::extract::extract_service(message),
            },
            None => RawMessage::sentinel(number, &range.label),
        })
    }
}
