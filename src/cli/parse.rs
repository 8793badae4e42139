//! Parse command: run the extraction engine on a single message

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::extract;
use crate::models::{RawMessage, SmsEvent};

/// Label used when no range is given
const NO_RANGE: &str = "Unknown";

/// Derive every field the relay would send for `message`.
pub fn run(format: OutputFormat, message: &str, range: Option<&str>) -> Result<()> {
    let event = derive(message, range.unwrap_or(NO_RANGE));

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "otp": event.otp,
                "service": event.service,
                "country": event.country,
                "country_flag": event.country_flag,
                "range": event.range,
                "identity": event.identity,
                "deliverable": event.is_deliverable(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty => {
            println!("OTP:         {}", event.otp.bold());
            println!("Service:     {}", event.service);
            println!("Country:     {} {}", event.country_flag, event.country);
            println!("Range:       {}", event.range);
            println!("Identity:    {}", event.identity.as_str().dimmed());
            if event.is_deliverable() {
                println!("{} Would be relayed", "✓".green());
            } else {
                println!("{} Would not be relayed", "✗".red());
            }
        }
    }

    Ok(())
}

fn derive(message: &str, range: &str) -> SmsEvent {
    SmsEvent::derive(&RawMessage {
        number: String::new(),
        range: range.to_string(),
        message: message.to_string(),
        service: extract::extract_service(message),
    })
}
