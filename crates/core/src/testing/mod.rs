//! Testing utilities and mock implementations.
//!
//! The mock resolver stands in for the upstream host; the fixtures build the
//! pages and archives a subtitle index serves, so tests can point the
//! pipeline at a local HTTP mock.
//!
//! # Example
//!
//! ```rust,ignore
//! use captionrelay_core::testing::{fixtures, MockCrossReference};
//!
//! let xref = MockCrossReference::new();
//! xref.set_id("12345", "tt0133093").await;
//!
//! let page = fixtures::index_page(&[("English", "/subtitles/a")]);
//! let archive = fixtures::subtitle_archive("movie.srt", fixtures::SAMPLE_SRT);
//! ```

mod mock_cross_reference;

pub use mock_cross_reference::MockCrossReference;

/// Test fixtures and helper functions.
pub mod fixtures {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    /// A two-cue SRT track.
    pub const SAMPLE_SRT: &str =
        "1\n00:00:01,000 --> 00:00:04,000\nHello\n\n2\n00:00:05,000 --> 00:00:06,500\nWorld\n";

    /// `SAMPLE_SRT` after conversion.
    pub const SAMPLE_VTT: &str =
        "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nHello\n\n00:00:05.000 --> 00:00:06.500\nWorld\n";

    /// Build a ZIP archive holding the given entries.
    pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(content).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }

    /// Build a ZIP archive with a single SRT entry.
    pub fn subtitle_archive(name: &str, srt: &str) -> Vec<u8> {
        zip_archive(&[(name, srt.as_bytes())])
    }

    /// Render an index page with one row per `(language, detail_path)`.
    pub fn index_page(rows: &[(&str, &str)]) -> String {
        let body: String = rows
            .iter()
            .enumerate()
            .map(|(i, (language, path))| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>Release.{}</td><td>uploader</td>\
                     <td><a href=\"{}\">download</a></td></tr>\n",
                    i, language, i, path
                )
            })
            .collect();

        format!(
            "<html><body><table><tbody>\n{}</tbody></table></body></html>",
            body
        )
    }

    /// Render a detail page whose download button points at `archive_url`.
    pub fn detail_page(archive_url: &str) -> String {
        format!(
            "<html><body><a id=\"btn-download-subtitle\" data-link=\"{}\">Download</a></body></html>",
            STANDARD.encode(archive_url)
        )
    }

    /// Render a listing response body as the share host returns it.
    pub fn listing_body(entries: serde_json::Value) -> String {
        serde_json::json!({ "code": 1, "data": { "file_list": entries } }).to_string()
    }

    /// Render a fragment response body as the share host returns it.
    pub fn fragment_body(html: &str) -> String {
        serde_json::json!({ "code": 1, "html": html }).to_string()
    }
}
