//! Extractors for the subtitle index and detail pages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::TaskError;

static ROW: Lazy<Selector> = Lazy::new(|| selector("tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static DOWNLOAD_BUTTON: Lazy<Selector> = Lazy::new(|| selector("a#btn-download-subtitle"));

/// Column holding the language name.
const LANGUAGE_COLUMN: usize = 1;
/// Column holding the link to the detail page.
const LINK_COLUMN: usize = 4;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Collect detail page links from every index row whose language column
/// contains `language`, in document order.
///
/// The match is a case-sensitive substring test so that variants such as
/// "English (SDH)" qualify. Rows without a link in the link column are
/// skipped.
pub fn parse_candidate_links(html: &str, language: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&ROW)
        .filter_map(|row| {
            let cells: Vec<_> = row.select(&CELL).collect();
            let lang = cells.get(LANGUAGE_COLUMN)?.text().collect::<String>();
            if !lang.trim().contains(language) {
                return None;
            }
            cells
                .get(LINK_COLUMN)?
                .select(&LINK)
                .next()?
                .value()
                .attr("href")
                .map(str::to_string)
        })
        .collect()
}

/// Read the encoded archive descriptor from a detail page.
pub fn parse_download_descriptor(html: &str) -> Result<String, TaskError> {
    let document = Html::parse_document(html);

    document
        .select(&DOWNLOAD_BUTTON)
        .next()
        .and_then(|button| button.value().attr("data-link"))
        .map(str::to_string)
        .ok_or(TaskError::NoDownloadLink)
}

/// Decode a base64 descriptor into the archive URL.
pub fn decode_archive_url(descriptor: &str) -> Result<String, TaskError> {
    let bytes = STANDARD
        .decode(descriptor.trim())
        .map_err(|e| TaskError::Decode(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| TaskError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAGE: &str = r#"
<html><body><table>
  <thead><tr><th>Rating</th><th>Language</th><th>Release</th><th>Uploader</th><th>Download</th></tr></thead>
  <tbody>
    <tr><td>5</td><td> English </td><td>Movie.1080p</td><td>alice</td><td><a href="/subtitles/movie-english-1">download</a></td></tr>
    <tr><td>3</td><td>French</td><td>Movie.720p</td><td>bob</td><td><a href="/subtitles/movie-french-1">download</a></td></tr>
    <tr><td>2</td><td>English (SDH)</td><td>Movie.WEB</td><td>carol</td><td><a href="/subtitles/movie-english-2">download</a></td></tr>
    <tr><td>1</td><td>english</td><td>Movie.CAM</td><td>dave</td><td><a href="/subtitles/movie-english-lower">download</a></td></tr>
    <tr><td>0</td><td>English</td><td>Movie.XviD</td><td>erin</td><td>no link</td></tr>
    <tr><td>4</td><td>Brazilian Portuguese, English</td><td>Movie.BluRay</td><td>frank</td><td><a href="/subtitles/movie-english-3">download</a></td></tr>
  </tbody>
</table></body></html>
"#;

    #[test]
    fn test_parse_candidate_links_filters_and_keeps_order() {
        let links = parse_candidate_links(INDEX_PAGE, "English");
        assert_eq!(
            links,
            vec![
                "/subtitles/movie-english-1",
                "/subtitles/movie-english-2",
                "/subtitles/movie-english-3",
            ]
        );
    }

    #[test]
    fn test_parse_candidate_links_is_case_sensitive() {
        let links = parse_candidate_links(INDEX_PAGE, "English");
        assert!(!links.iter().any(|l| l.ends_with("lower")));
    }

    #[test]
    fn test_parse_candidate_links_none_matching() {
        assert!(parse_candidate_links(INDEX_PAGE, "Klingon").is_empty());
        assert!(parse_candidate_links("<html></html>", "English").is_empty());
    }

    #[test]
    fn test_parse_download_descriptor() {
        let html = r#"<div><a id="btn-download-subtitle" class="btn" data-link="aHR0cDovL2V4YW1wbGUvc3ViLnppcA==">Download</a></div>"#;
        assert_eq!(
            parse_download_descriptor(html).unwrap(),
            "aHR0cDovL2V4YW1wbGUvc3ViLnppcA=="
        );
    }

    #[test]
    fn test_parse_download_descriptor_missing() {
        let no_button = r#"<div><a id="other" data-link="x">Download</a></div>"#;
        assert_eq!(
            parse_download_descriptor(no_button),
            Err(TaskError::NoDownloadLink)
        );

        let no_attr = r#"<a id="btn-download-subtitle">Download</a>"#;
        assert_eq!(
            parse_download_descriptor(no_attr),
            Err(TaskError::NoDownloadLink)
        );
    }

    #[test]
    fn test_decode_archive_url() {
        assert_eq!(
            decode_archive_url("aHR0cDovL2V4YW1wbGUvc3ViLnppcA==").unwrap(),
            "http://example/sub.zip"
        );
    }

    #[test]
    fn test_decode_archive_url_invalid() {
        assert!(matches!(
            decode_archive_url("%%%not-base64%%%"),
            Err(TaskError::Decode(_))
        ));
        // Valid base64, invalid UTF-8
        assert!(matches!(decode_archive_url("/w=="), Err(TaskError::Decode(_))));
    }
}
