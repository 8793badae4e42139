//! Mock transport for testing

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{OutgoingMessage, Transport, TransportResult};
use crate::error::TransportError;

/// Records every send and replays scripted failures.
#[derive(Default)]
pub struct MockTransport {
    /// Successful sends, in completion order
    sent: Arc<Mutex<Vec<(String, OutgoingMessage)>>>,
    /// Errors returned by the next sends, consumed in order
    send_errors: Arc<Mutex<VecDeque<TransportError>>>,
    /// Recipients that always fail resolution
    unreachable: Arc<Mutex<HashMap<String, TransportError>>>,
    call_count: Arc<Mutex<CallCounts>>,
}

#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub resolve_recipient: usize,
    pub send_message: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue errors for the next sends, whichever recipient they target.
    pub async fn with_send_errors(self, errors: Vec<TransportError>) -> Self {
        self.send_errors.lock().await.extend(errors);
        self
    }

    /// Make a recipient fail resolution with `error`.
    pub async fn with_unreachable(self, recipient: &str, error: TransportError) -> Self {
        self.unreachable
            .lock()
            .await
            .insert(recipient.to_string(), error);
        self
    }

    pub async fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, recipient: &str) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == recipient)
            .count()
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn resolve_recipient(&self, recipient: &str) -> TransportResult<()> {
        self.call_count.lock().await.resolve_recipient += 1;
        match self.unreachable.lock().await.get(recipient) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn send_message(&self, recipient: &str, message: &OutgoingMessage) -> TransportResult<()> {
        self.call_count.lock().await.send_message += 1;
        if let Some(error) = self.send_errors.lock().await.pop_front() {
            return Err(error);
        }
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), message.clone()));
        Ok(())
    }
}
