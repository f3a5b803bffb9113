//! Upstream content host integration.
//!
//! Resolves folder listings, quality-tagged playback links and
//! cross-reference ids for files on the share host. Listings are cached
//! with a TTL and concurrent identical requests share one upstream call.

mod client;
pub mod parse;
mod types;

pub use client::UpstreamClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the upstream host.
///
/// `Clone` so that every caller coalesced onto one in-flight request
/// receives an equal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Required input missing.
    #[error("{0}")]
    InvalidRequest(String),

    /// Network failure or timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Upstream answered with a body we could not make sense of.
    #[error("Unexpected upstream response: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Transport(e.to_string())
    }
}

/// Resolves the external catalog id (e.g. an IMDB id) for a file.
///
/// An empty string means the host knows no id for the file.
#[async_trait]
pub trait CrossReferenceResolver: Send + Sync {
    async fn resolve_cross_reference(&self, fid: &str) -> Result<String, UpstreamError>;
}
