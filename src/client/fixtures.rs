//! Test fixtures for dashboard markup
//!
//! Builders producing the HTML fragments the dashboard serves, shaped the
//! way the parsers in [`html`](super::html) expect them.
//! Import via `use crate::client::fixtures::*` in test modules.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Login page with the credential form and an anti-forgery token.
pub fn login_page(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Login</title></head>
<body>
  <form method="POST" action="/login">
    <input type="hidden" name="_token" value="{token}">
    <input type="email" name="email">
    <input type="password" name="password">
    <button type="submit">Login</button>
  </form>
</body>
</html>"#
    )
}

/// Landing page after a successful login; carries the rotated token.
pub fn portal_page(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta name="csrf-token" content="{token}"><title>Portal</title></head>
<body><div class="container">Received SMS</div></body>
</html>"#
    )
}

/// Ranges listing fragment.
pub fn ranges_page(ranges: &[(&str, u32)]) -> String {
    ranges
        .iter()
        .map(|(label, count)| {
            format!(
                r#"<div class="item"><div class="row">
  <div class="col-sm-4">{label}</div>
  <div class="col-3"><p>{count}</p></div>
</div></div>"#
            )
        })
        .collect()
}

/// Numbers listing fragment for one range.
pub fn numbers_page(numbers: &[&str]) -> String {
    numbers
        .iter()
        .map(|number| format!(r#"<div class="row"><div class="col-sm-4">{number}</div></div>"#))
        .collect()
}

/// Detail fragment with a sender label and one message.
pub fn detail_page(sender: &str, message: &str) -> String {
    format!(
        r#"<div class="row">
  <div class="col-sm-4">{sender}</div>
  <div class="col-9 col-sm-6"><p class="mb-0 pb-0">{message}</p></div>
</div>"#
    )
}

/// Gzip a body for compressed-response tests.
pub fn gzip_compress(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Brotli-encode a body for `content-encoding: br` responses.
pub fn brotli_compress(body: &str) -> Vec<u8> {
    let mut encoder = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.into_inner()
}
