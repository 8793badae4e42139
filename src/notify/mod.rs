//! Outbound notifications
//!
//! A [`Transport`] delivers one formatted message to one recipient; the
//! [`Dispatcher`] fans a message out to every recipient and deals with
//! flood control.

use async_trait::async_trait;

use crate::error::TransportError;

pub mod dispatcher;
pub mod format;
#[cfg(test)]
pub mod mock;
pub mod telegram;

pub use dispatcher::{DeliveryReport, DeliveryStatus, Dispatcher};
#[cfg(test)]
pub use mock::MockTransport;
pub use telegram::TelegramTransport;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Inline button attached under a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Copies `text` to the reader's clipboard
    CopyText { label: String, text: String },
    /// Opens a link
    Url { label: String, url: String },
}

/// HTML-formatted message with a single row of buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub buttons: Vec<Button>,
}

/// Messaging platform seam
#[async_trait]
pub trait Transport: Send + Sync {
    /// Check that the recipient exists and is reachable before sending.
    async fn resolve_recipient(&self, recipient: &str) -> TransportResult<()>;

    /// Send one message to one recipient.
    async fn send_message(&self, recipient: &str, message: &OutgoingMessage) -> TransportResult<()>;
}
