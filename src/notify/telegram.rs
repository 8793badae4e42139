//! Telegram Bot API transport

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{Button, OutgoingMessage, Transport, TransportResult};
use crate::config::TelegramConfig;
use crate::error::TransportError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope of every Bot API reply
#[derive(Debug, Deserialize)]
struct BotReply {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ReplyParameters>,
}

#[derive(Debug, Deserialize)]
struct ReplyParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

pub struct TelegramTransport {
    http: HttpClient,
    api_base: String,
    bot_token: SecretString,
    /// Recipients already confirmed by getChat
    resolved: Mutex<HashSet<String>>,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> TransportResult<Self> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base().trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            resolved: Mutex::new(HashSet::new()),
        })
    }

    async fn call(&self, method: &str, recipient: &str, payload: &Value) -> TransportResult<()> {
        let endpoint = format!(
            "{}/bot{}/{}",
            self.api_base,
            self.bot_token.expose_secret(),
            method
        );

        debug!("Bot API {} for {}", method, recipient);
        // without_url keeps the bot token out of error messages
        let response = self
            .http
            .post(&endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;

        let status = response.status();
        let reply: BotReply = response
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("HTTP {}: {}", status, e.without_url())))?;

        if reply.ok {
            return Ok(());
        }
        Err(classify(recipient, reply))
    }
}

fn classify(recipient: &str, reply: BotReply) -> TransportError {
    let description = reply.description.unwrap_or_default();
    match reply.error_code {
        Some(429) => {
            let seconds = reply
                .parameters
                .and_then(|p| p.retry_after)
                .unwrap_or(1);
            TransportError::FloodWait(Duration::from_secs(seconds))
        }
        Some(403) => TransportError::WriteForbidden(recipient.to_string()),
        Some(400) if description.to_lowercase().contains("chat not found") => {
            TransportError::UnknownRecipient(recipient.to_string())
        }
        Some(code) => TransportError::Rejected(format!("{}: {}", code, description)),
        None => TransportError::Rejected(description),
    }
}

fn keyboard(buttons: &[Button]) -> Value {
    let row: Vec<Value> = buttons
        .iter()
        .map(|button| match button {
            Button::CopyText { label, text } => json!({
                "text": label,
                "copy_text": { "text": text },
            }),
            Button::Url { label, url } => json!({ "text": label, "url": url }),
        })
        .collect();
    json!({ "inline_keyboard": [row] })
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn resolve_recipient(&self, recipient: &str) -> TransportResult<()> {
        if self.resolved.lock().await.contains(recipient) {
            return Ok(());
        }

        self.call("getChat", recipient, &json!({ "chat_id": recipient }))
            .await?;
        self.resolved.lock().await.insert(recipient.to_string());
        Ok(())
    }

    async fn send_message(&self, recipient: &str, message: &OutgoingMessage) -> TransportResult<()> {
        let mut payload = json!({
            "chat_id": recipient,
            "text": message.text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if !message.buttons.is_empty() {
            payload["reply_markup"] = keyboard(&message.buttons);
        }

        self.call("sendMessage", recipient, &payload).await
    }
}
