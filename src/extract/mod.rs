//! Extraction engine
//!
//! Pure functions that turn a scraped SMS body and range label into the
//! fields of an [`SmsEvent`](crate::models::SmsEvent). Nothing here does I/O.

mod countries;
mod services;

use std::sync::LazyLock;

use regex::Regex;

pub use countries::{country_flag, lookup_alpha2};
pub use services::SERVICE_PATTERNS;

/// Placeholder for an unresolved service or country
pub const UNKNOWN: &str = "Unknown";

/// Placeholder when a message carries no recognisable code
pub const NO_OTP: &str = "No OTP found";

static OTP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{4,6}|\d{3}\s\d{3})\b|verification code: (\w+)")
        .expect("OTP pattern is a valid regex")
});

/// Extract the first OTP-looking token from a message.
///
/// Matches a 4-6 digit run, a `123 456` split code, or a whole
/// `verification code: <token>` phrase. The first match in the text wins,
/// and the result always matches itself again.
pub fn extract_otp(message: &str) -> String {
    OTP_PATTERN
        .find(message)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_OTP.to_string())
}

/// Resolve the service a message came from using the ordered pattern table.
pub fn extract_service(message: &str) -> String {
    services::compiled()
        .iter()
        .find(|(_, pattern)| pattern.is_match(message))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Country name from a range label: the first word, capitalised, when the
/// label has at least two words.
pub fn extract_country(range_label: &str) -> String {
    let mut tokens = range_label.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(first), Some(_)) => capitalize(first),
        _ => UNKNOWN.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
