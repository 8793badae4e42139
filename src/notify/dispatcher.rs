//! Concurrent fan-out to every recipient
//!
//! Each recipient is sent to independently; one failure never cancels its
//! siblings. When the platform asks for a flood wait, the whole round is
//! repeated once after the requested delay.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures::future::join_all;
use log::{error, info, warn};

use super::{OutgoingMessage, Transport, format};
use crate::error::TransportError;
use crate::models::SmsEvent;

/// Added on top of the platform's flood-wait request
const FLOOD_WAIT_MARGIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    /// Recipient cannot be written to or does not exist
    Skipped(TransportError),
    /// Platform throttled the send
    FloodWait(Duration),
    Failed(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub status: DeliveryStatus,
}

/// Per-recipient results of one delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcomes: Vec<RecipientOutcome>,
    /// Whether a flood wait forced a second round
    pub retried: bool,
}

impl DeliveryReport {
    pub fn sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Sent)
            .count()
    }

    pub fn undelivered(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    fn flood_wait(&self) -> Option<Duration> {
        self.outcomes
            .iter()
            .filter_map(|o| match o.status {
                DeliveryStatus::FloodWait(wait) => Some(wait),
                _ => None,
            })
            .max()
    }
}

struct Target<'a> {
    id: &'a str,
    /// Confirm the recipient with the platform before sending
    resolve: bool,
}

pub struct Dispatcher<T: Transport + ?Sized> {
    transport: Arc<T>,
    recipients: Vec<String>,
}

impl<T: Transport + ?Sized> Dispatcher<T> {
    pub fn new(transport: Arc<T>, recipients: Vec<String>) -> Self {
        Self {
            transport,
            recipients,
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Send the OTP notification for `event` to every recipient.
    pub async fn deliver(&self, event: &SmsEvent) -> DeliveryReport {
        let message = format::otp_message(event, &Local::now());
        let targets: Vec<Target<'_>> = self
            .recipients
            .iter()
            .map(|id| Target { id, resolve: true })
            .collect();

        let report = self.broadcast(&targets, &message).await;
        info!(
            "OTP {} for {} delivered to {}/{} recipients",
            event.otp,
            event.number,
            report.sent(),
            targets.len()
        );
        report
    }

    /// Announce start-up to every recipient and the owner.
    ///
    /// The owner is a user rather than a chat and is not resolved first.
    pub async fn send_start_alert(
        &self,
        owner_id: Option<&str>,
        updates_url: Option<&str>,
    ) -> DeliveryReport {
        let message = format::start_alert(&Local::now(), owner_id, updates_url);

        let mut targets: Vec<Target<'_>> = self
            .recipients
            .iter()
            .map(|id| Target { id, resolve: true })
            .collect();
        if let Some(owner) = owner_id.filter(|owner| !self.recipients.iter().any(|r| r == owner)) {
            targets.push(Target {
                id: owner,
                resolve: false,
            });
        }

        let report = self.broadcast(&targets, &message).await;
        info!(
            "Start alert sent to {}/{} recipients",
            report.sent(),
            targets.len()
        );
        report
    }

    /// One round, then after a flood wait the whole target list once more.
    /// Targets already served in the first round receive the message twice.
    async fn broadcast(&self, targets: &[Target<'_>], message: &OutgoingMessage) -> DeliveryReport {
        let first = self.send_round(targets, message).await;
        let Some(wait) = first.flood_wait() else {
            return first;
        };

        warn!("Flood wait: waiting {}s before resending", wait.as_secs());
        tokio::time::sleep(wait + FLOOD_WAIT_MARGIN).await;

        let mut second = self.send_round(targets, message).await;
        for outcome in &second.outcomes {
            if let DeliveryStatus::FloodWait(wait) = outcome.status {
                error!(
                    "Dropping message for {}: flood wait of {}s after retry",
                    outcome.recipient,
                    wait.as_secs()
                );
            }
        }
        second.retried = true;
        second
    }

    async fn send_round(&self, targets: &[Target<'_>], message: &OutgoingMessage) -> DeliveryReport {
        let outcomes = join_all(targets.iter().map(|target| self.send_one(target, message))).await;
        DeliveryReport {
            outcomes,
            retried: false,
        }
    }

    async fn send_one(&self, target: &Target<'_>, message: &OutgoingMessage) -> RecipientOutcome {
        let mut result = Ok(());
        if target.resolve {
            result = self.transport.resolve_recipient(target.id).await;
        }
        if result.is_ok() {
            result = self.transport.send_message(target.id, message).await;
        }

        RecipientOutcome {
            recipient: target.id.to_string(),
            status: classify(target.id, result),
        }
    }
}

fn classify(recipient: &str, result: Result<(), TransportError>) -> DeliveryStatus {
    match result {
        Ok(()) => DeliveryStatus::Sent,
        Err(TransportError::FloodWait(wait)) => DeliveryStatus::FloodWait(wait),
        Err(err @ TransportError::WriteForbidden(_)) => {
            error!("Bot cannot send messages to chat {}: write access forbidden", recipient);
            DeliveryStatus::Skipped(err)
        }
        Err(err @ TransportError::UnknownRecipient(_)) => {
            error!("Chat {} not found", recipient);
            DeliveryStatus::Skipped(err)
        }
        Err(err) => {
            error!("Error sending to chat {}: {}", recipient, err);
            DeliveryStatus::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMessage;
    use crate::notify::{Button, MockTransport};

    fn event() -> SmsEvent {
        SmsEvent::derive(&RawMessage {
            number: "+551199990000".to_string(),
            range: "Brazil Main".to_string(),
            message: "Your WhatsApp code is 739201".to_string(),
            service: "WhatsApp".to_string(),
        })
    }

    fn recipients(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_deliver_reaches_every_recipient() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1", "-2", "-3"]));

        let report = dispatcher.deliver(&event()).await;

        assert_eq!(report.sent(), 3);
        assert!(!report.retried);
        for id in ["-1", "-2", "-3"] {
            assert_eq!(transport.sent_to(id).await, 1);
        }
        let sent = transport.sent().await;
        assert!(sent[0].1.text.contains("739201"));
        assert!(matches!(sent[0].1.buttons[0], Button::CopyText { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_retries_once_after_wait() {
        let transport = Arc::new(
            MockTransport::new()
                .with_send_errors(vec![TransportError::FloodWait(Duration::from_secs(2))])
                .await,
        );
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1"]));

        let started = tokio::time::Instant::now();
        let report = dispatcher.deliver(&event()).await;

        assert_eq!(transport.call_counts().await.send_message, 2);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(report.retried);
        assert_eq!(report.sent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_flood_wait_is_dropped() {
        let transport = Arc::new(
            MockTransport::new()
                .with_send_errors(vec![
                    TransportError::FloodWait(Duration::from_secs(2)),
                    TransportError::FloodWait(Duration::from_secs(2)),
                ])
                .await,
        );
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1"]));

        let report = dispatcher.deliver(&event()).await;

        assert_eq!(transport.call_counts().await.send_message, 2);
        assert_eq!(report.sent(), 0);
        assert_eq!(report.undelivered(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_retry_repeats_served_recipients() {
        let transport = Arc::new(
            MockTransport::new()
                .with_send_errors(vec![TransportError::FloodWait(Duration::from_secs(1))])
                .await,
        );
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1", "-2"]));

        let report = dispatcher.deliver(&event()).await;

        assert!(report.retried);
        assert_eq!(report.sent(), 2);
        // one recipient got the first round as well as the retry
        assert_eq!(transport.sent().await.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_recipient_is_skipped() {
        let transport = Arc::new(
            MockTransport::new()
                .with_unreachable("-2", TransportError::WriteForbidden("-2".to_string()))
                .await,
        );
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1", "-2", "-3"]));

        let report = dispatcher.deliver(&event()).await;

        assert_eq!(report.sent(), 2);
        assert_eq!(transport.sent_to("-2").await, 0);
        assert!(matches!(
            report.outcomes[1].status,
            DeliveryStatus::Skipped(TransportError::WriteForbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_start_alert_includes_owner_without_resolving() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1", "-2"]));

        let report = dispatcher
            .send_start_alert(Some("777"), Some("https://t.me/updates"))
            .await;

        assert_eq!(report.sent(), 3);
        assert_eq!(transport.sent_to("777").await, 1);
        assert_eq!(transport.call_counts().await.resolve_recipient, 2);
    }

    #[tokio::test]
    async fn test_start_alert_owner_already_a_recipient() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Dispatcher::new(transport.clone(), recipients(&["-1", "777"]));

        dispatcher.send_start_alert(Some("777"), None).await;
        assert_eq!(transport.sent_to("777").await, 1);
    }
}
