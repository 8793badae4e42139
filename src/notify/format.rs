//! Notification templates
//!
//! Messages are rendered for Telegram's HTML parse mode, so every field that
//! comes from the dashboard is escaped.

use chrono::{DateTime, TimeZone};

use super::{Button, OutgoingMessage};
use crate::models::SmsEvent;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━";

/// Escape text for Telegram HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The per-OTP notification.
pub fn otp_message<Tz>(event: &SmsEvent, at: &DateTime<Tz>) -> OutgoingMessage
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let otp = escape_html(&event.otp);
    let text = [
        format!(
            "<b>{} {} SMS OTP Received Successfully ✅</b>",
            event.country_flag,
            escape_html(&event.country)
        ),
        format!("<b>{RULE}</b>"),
        format!("<b>⚡️ OTP Code :</b> <code>{otp}</code>"),
        format!("<b>⏰ Time:</b> <code>{}</code>", at.format("%H:%M:%S")),
        format!("<b>📅 Date:</b> <code>{}</code>", at.format("%d-%m-%Y")),
        format!(
            "<b>💰 Service:</b> <code>{}</code>",
            escape_html(&event.service)
        ),
        "<b>💸 Payment:</b> <code>Paid</code>".to_string(),
        format!(
            "<b>🔍 Phone Number:</b> <code>{}</code>",
            escape_html(&event.number)
        ),
        format!(
            "<b>❤️ OTP Message :</b> <code>{}</code>",
            escape_html(&event.full_message)
        ),
        format!("<b>{RULE}</b>"),
        "<b>Note: Don't Spam Here Just Wait Else Ban 🚫</b>".to_string(),
    ]
    .join("\n");

    OutgoingMessage {
        text,
        buttons: vec![Button::CopyText {
            label: "Copy OTP Code 🗒".to_string(),
            text: event.otp.clone(),
        }],
    }
}

/// One-time announcement sent when monitoring starts.
pub fn start_alert<Tz>(
    at: &DateTime<Tz>,
    owner_id: Option<&str>,
    updates_url: Option<&str>,
) -> OutgoingMessage
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let text = [
        "<b>OTP Relay Started Successfully ✅</b>".to_string(),
        format!("<b>{RULE}</b>"),
        format!("<b>⏰ Time:</b> <code>{}</code>", at.format("%H:%M:%S")),
        format!("<b>📅 Date:</b> <code>{}</code>", at.format("%d-%m-%Y")),
        "<b>💰 Traffic:</b> Running.....📡".to_string(),
        "<b>📩 OTP Scraper:</b> Running...🔍".to_string(),
        format!("<b>{RULE}</b>"),
        "<b>Don't Spam Here Just Wait For OTP ❌</b>".to_string(),
    ]
    .join("\n");

    let mut buttons = Vec::new();
    if let Some(owner) = owner_id {
        buttons.push(Button::Url {
            label: "👨🏻‍💻 Developer".to_string(),
            url: format!("tg://user?id={owner}"),
        });
    }
    if let Some(url) = updates_url {
        buttons.push(Button::Url {
            label: "Updates Channel".to_string(),
            url: url.to_string(),
        });
    }

    OutgoingMessage { text, buttons }
}
