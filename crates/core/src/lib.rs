pub mod cache;
pub mod config;
pub mod metrics;
pub mod subtitles;
pub mod testing;
pub mod upstream;

pub use cache::CoalescingCache;
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    SanitizedConfig, ServerConfig, SubtitleConfig, UpstreamConfig,
};
pub use subtitles::{CaptionAsset, CaptionStore, SubtitleError, SubtitlePipeline, TaskError};
pub use upstream::{
    CrossReferenceResolver, FileListing, ListingKey, QualityLink, UpstreamClient, UpstreamError,
};
