use std::sync::Arc;
use captionrelay_core::{Config, SanitizedConfig, SubtitlePipeline, UpstreamClient};

/// Shared application state
pub struct AppState {
    config: Config,
    upstream: Arc<UpstreamClient>,
    subtitles: Arc<SubtitlePipeline>,
}

impl AppState {
    pub fn new(
        config: Config,
        upstream: Arc<UpstreamClient>,
        subtitles: Arc<SubtitlePipeline>,
    ) -> Self {
        Self {
            config,
            upstream,
            subtitles,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn upstream(&self) -> &UpstreamClient {
        self.upstream.as_ref()
    }

    pub fn subtitles(&self) -> &SubtitlePipeline {
        self.subtitles.as_ref()
    }
}
