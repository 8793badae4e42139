//! Domain records flowing through the monitoring pipeline

use serde::{Deserialize, Serialize};

use crate::extract::{self, NO_OTP, UNKNOWN};

/// Body placeholder when a number has no readable message
pub const NO_MESSAGE: &str = "No message found";

/// Number of body characters folded into a message identity
pub const IDENTITY_PREFIX_CHARS: usize = 50;

/// A named block of provisioned numbers on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Label as shown by the dashboard, e.g. "Brazil Main"
    pub label: String,

    /// Nominal count of numbers the dashboard declares for the range
    pub count: u32,
}

impl Range {
    pub fn new(label: impl Into<String>, count: u32) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Latest message for a number, as scraped from the detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub number: String,
    pub range: String,
    pub message: String,
    pub service: String,
}

impl RawMessage {
    /// The placeholder produced when a detail fetch fails or is empty
    pub fn sentinel(number: &str, range: &str) -> Self {
        Self {
            number: number.to_string(),
            range: range.to_string(),
            message: NO_MESSAGE.to_string(),
            service: UNKNOWN.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.message == NO_MESSAGE
    }
}

/// Stable dedup key: `{number}_{first 50 chars of body}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageIdentity(String);

impl MessageIdentity {
    pub fn derive(number: &str, message: &str) -> Self {
        let prefix: String = message.chars().take(IDENTITY_PREFIX_CHARS).collect();
        Self(format!("{number}_{prefix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageIdentity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for MessageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully derived OTP event, ready for dedup and delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsEvent {
    pub range: String,
    pub country: String,
    pub country_flag: String,
    pub service: String,
    pub number: String,
    pub otp: String,
    pub full_message: String,
    pub identity: MessageIdentity,
}

impl SmsEvent {
    /// Run the extraction engine over a scraped message
    pub fn derive(raw: &RawMessage) -> Self {
        let country = extract::extract_country(&raw.range);
        let country_flag = extract::country_flag(&country);
        Self {
            range: raw.range.clone(),
            country_flag,
            country,
            service: raw.service.clone(),
            number: raw.number.clone(),
            otp: extract::extract_otp(&raw.message),
            full_message: raw.message.clone(),
            identity: MessageIdentity::derive(&raw.number, &raw.message),
        }
    }

    /// Only events with a real body and a real code are worth delivering
    pub fn is_deliverable(&self) -> bool {
        self.full_message != NO_MESSAGE && self.otp != NO_OTP
    }
}
