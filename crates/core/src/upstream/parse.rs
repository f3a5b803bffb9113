//! Extractors for the upstream host's responses.
//!
//! The host has no stable API: listings come back as loosely-shaped JSON and
//! the quality list and file details are HTML fragments wrapped in JSON. Each
//! extractor here has exactly one failure mode so that a markup change
//! surfaces as one localized error.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::{QualityLink, UpstreamError};

static QUALITY_ROW: Lazy<Selector> = Lazy::new(|| selector(".file_quality"));
static QUALITY_NAME: Lazy<Selector> = Lazy::new(|| selector(".name"));
static QUALITY_SPEED: Lazy<Selector> = Lazy::new(|| selector(".speed span"));
static QUALITY_SIZE: Lazy<Selector> = Lazy::new(|| selector(".size"));
static IMDB: Lazy<Selector> = Lazy::new(|| selector(".imdb"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Extract `data.file_list` from a share listing response.
pub fn parse_file_listing(body: &[u8]) -> Result<Vec<Value>, UpstreamError> {
    let data: Value = serde_json::from_slice(body)
        .map_err(|e| UpstreamError::Upstream(format!("malformed listing JSON: {}", e)))?;

    match data.get("data").and_then(|d| d.get("file_list")) {
        Some(Value::Array(entries)) => Ok(entries.clone()),
        _ => Err(UpstreamError::Upstream(
            "listing response has no data.file_list array".to_string(),
        )),
    }
}

/// Extract the `html` string embedded in a JSON response.
///
/// Returns `Ok(None)` when the body is valid JSON without an `html` string.
pub fn extract_html_fragment(body: &[u8]) -> Result<Option<String>, UpstreamError> {
    let data: Value = serde_json::from_slice(body)
        .map_err(|e| UpstreamError::Upstream(format!("malformed JSON: {}", e)))?;

    Ok(data
        .get("html")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Parse every `.file_quality` element of a quality-list fragment, in
/// document order.
pub fn parse_quality_links(html: &str) -> Vec<QualityLink> {
    let fragment = Html::parse_fragment(html);

    fragment
        .select(&QUALITY_ROW)
        .map(|row| QualityLink {
            url: row.value().attr("data-url").unwrap_or_default().to_string(),
            quality: row
                .value()
                .attr("data-quality")
                .unwrap_or_default()
                .to_string(),
            name: child_text(row, &QUALITY_NAME),
            speed: child_text(row, &QUALITY_SPEED),
            size: child_text(row, &QUALITY_SIZE),
        })
        .collect()
}

/// Read `data-imdb-id` from the first `.imdb` element. Empty when either
/// the element or the attribute is missing.
pub fn parse_cross_reference(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    fragment
        .select(&IMDB)
        .next()
        .and_then(|el| el.value().attr("data-imdb-id"))
        .unwrap_or_default()
        .to_string()
}

fn child_text(parent: ElementRef<'_>, selector: &Selector) -> String {
    parent
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}
