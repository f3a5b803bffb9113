//! Subtitle acquisition pipeline.
//!
//! Given a file id, produce an ordered list of WebVTT caption tracks:
//! serve them from the per-fid directory when present, otherwise resolve the
//! file's cross-reference id, scrape the subtitle index for English
//! candidates, and fetch/convert up to three of them concurrently.

mod archive;
pub mod convert;
mod pipeline;
pub mod scrape;
mod store;

pub use archive::extract_source_track;
pub use convert::srt_to_vtt;
pub use pipeline::{assemble, SubtitlePipeline, LANGUAGE_FILTER, MAX_CANDIDATES};
pub use store::CaptionStore;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File extension of converted caption tracks.
pub const CAPTION_EXTENSION: &str = "vtt";

/// File extension of the source tracks looked for inside archives.
pub const SOURCE_EXTENSION: &str = ".srt";

/// A converted, persisted caption track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionAsset {
    /// 1-based position of the candidate in the original scrape order.
    #[serde(skip)]
    pub slot: usize,
    pub label: String,
    pub src: String,
}

/// One index row that passed the language filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCandidate {
    /// 0-based position among the qualifying rows.
    pub index: usize,
    /// Detail page path relative to the index host.
    pub detail_path: String,
}

/// Caller-visible pipeline failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubtitleError {
    /// Missing or malformed input.
    #[error("{0}")]
    InvalidRequest(String),

    /// No cross-reference id, or no matching subtitles.
    #[error("{0}")]
    NotFound(String),

    /// Every candidate failed.
    #[error("{0}")]
    Internal(String),
}

/// Failure of a single candidate's fetch/convert task.
///
/// These are logged and excluded from the result, never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("detail page has no download link")]
    NoDownloadLink,

    #[error("failed to decode download link: {0}")]
    Decode(String),

    #[error("failed to open archive: {0}")]
    Archive(String),

    #[error("archive contains no {} entry", SOURCE_EXTENSION)]
    NoSourceTrack,

    #[error("failed to persist caption track: {0}")]
    Persist(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Transport(_) => "transport",
            TaskError::NoDownloadLink => "no_download_link",
            TaskError::Decode(_) => "decode",
            TaskError::Archive(_) => "archive",
            TaskError::NoSourceTrack => "no_source_track",
            TaskError::Persist(_) => "persist",
            TaskError::Timeout(_) => "timeout",
            TaskError::Panicked(_) => "panicked",
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(e: reqwest::Error) -> Self {
        TaskError::Transport(e.to_string())
    }
}
