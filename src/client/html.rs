//! Markup parsing for dashboard pages
//!
//! The dashboard answers every listing call with an HTML fragment. These
//! helpers turn those fragments into domain records.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::extract::{self, UNKNOWN};
use crate::models::{NO_MESSAGE, Range, RawMessage};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selectors are valid CSS")
}

static TOKEN_INPUT: LazyLock<Selector> = LazyLock::new(|| selector(r#"input[name="_token"]"#));
static TOKEN_META: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[name="csrf-token"]"#));
static PASSWORD_INPUT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"input[name="password"]"#));
static RANGE_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("div.item"));
static COLUMN: LazyLock<Selector> = LazyLock::new(|| selector("div.col-sm-4"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static MESSAGE_BODY: LazyLock<Selector> =
    LazyLock::new(|| selector("div.col-9.col-sm-6 p.mb-0.pb-0"));

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Anti-forgery token from a form input, falling back to the meta tag.
pub fn extract_token(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    let from_input = document
        .select(&TOKEN_INPUT)
        .filter_map(|input| input.value().attr("value"))
        .find(|value| !value.is_empty());

    let from_meta = || {
        document
            .select(&TOKEN_META)
            .filter_map(|meta| meta.value().attr("content"))
            .find(|value| !value.is_empty())
    };

    from_input.or_else(from_meta).map(str::to_string)
}

/// Whether a page still shows the credential form.
pub fn has_login_form(body: &str) -> bool {
    let document = Html::parse_document(body);
    document.select(&PASSWORD_INPUT).next().is_some()
}

/// Ranges listed on the received-SMS page.
pub fn parse_ranges(body: &str) -> Vec<Range> {
    let document = Html::parse_fragment(body);
    document
        .select(&RANGE_ITEM)
        .map(|item| {
            let label = item
                .select(&COLUMN)
                .next()
                .map(text_of)
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string());

            let count = item
                .select(&PARAGRAPH)
                .map(text_of)
                .find(|text| !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()))
                .and_then(|text| text.parse().ok())
                .unwrap_or(0);

            Range { label, count }
        })
        .collect()
}

/// Phone numbers listed for a range.
pub fn parse_numbers(body: &str) -> Vec<String> {
    let document = Html::parse_fragment(body);
    document
        .select(&COLUMN)
        .map(text_of)
        .filter(|number| !number.is_empty())
        .collect()
}

/// Latest message and service label from a number's detail view.
///
/// A service recognised in the message body takes precedence over the
/// dashboard's own label.
pub fn parse_detail(body: &str, number: &str, range: &str) -> RawMessage {
    let document = Html::parse_fragment(body);

    let message = document
        .select(&MESSAGE_BODY)
        .map(text_of)
        .next()
        .unwrap_or_else(|| NO_MESSAGE.to_string());

    let scraped_service = document
        .select(&COLUMN)
        .next()
        .map(|column| text_of(column).replace("CLI", "").trim().to_string())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let service = match extract::extract_service(&message) {
        recognised if recognised != UNKNOWN => recognised,
        _ => scraped_service,
    };

    RawMessage {
        number: number.to_string(),
        range: range.to_string(),
        message,
        service,
    }
}
