use std::sync::LazyLock;

use regex::Regex;

/// Service name to case-insensitive keyword pattern. Order is significant:
/// the first entry whose pattern matches wins.
pub const SERVICE_PATTERNS: &[(&str, &str)] = &[
    ("WhatsApp", r"(whatsapp|wa\.me|verify|wassap|whtsapp)"),
    ("Facebook", r"(facebook|fb\.me|fb\-|meta)"),
    ("Telegram", r"(telegram|t\.me|tg|telegrambot)"),
    ("Google", r"(google|gmail|goog|g\.co|accounts\.google)"),
    ("Twitter", r"(twitter|x\.com|twtr)"),
    ("Instagram", r"(instagram|insta|ig)"),
    ("Lalamove", r"(lalamove)"),
    ("Apple", r"(apple|icloud|appleid)"),
    ("Amazon", r"(amazon|amzn)"),
    ("Microsoft", r"(microsoft|msft|outlook|hotmail)"),
    ("PayPal", r"(paypal)"),
    ("Netflix", r"(netflix)"),
    ("Uber", r"(uber)"),
    ("TikTok", r"(tiktok)"),
    ("LinkedIn", r"(linkedin)"),
    ("Spotify", r"(spotify)"),
];

static COMPILED: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SERVICE_PATTERNS
        .iter()
        .map(|(name, pattern)| {
            let regex = Regex::new(&format!("(?i){pattern}"))
                .expect("service patterns are valid regexes");
            (*name, regex)
        })
        .collect()
});

pub(super) fn compiled() -> &'static [(&'static str, Regex)] {
    &COMPILED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile_in_order() {
        let names: Vec<&str> = compiled().iter().map(|(name, _)| *name).collect();
        let expected: Vec<&str> = SERVICE_PATTERNS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, expected);
        assert_eq!(names.first(), Some(&"WhatsApp"));
        assert_eq!(names.last(), Some(&"Spotify"));
    }

    #[test]
    fn test_whatsapp_precedes_telegram() {
        let position = |wanted: &str| {
            SERVICE_PATTERNS
                .iter()
                .position(|(name, _)| *name == wanted)
                .unwrap()
        };
        assert!(position("WhatsApp") < position("Telegram"));
    }
}
