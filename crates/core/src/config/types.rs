use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub subtitles: SubtitleConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public origin used when building caption URLs (e.g. "https://subs.example.com").
    /// When unset, the origin is derived from the request's Host header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

/// Upstream content host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Content host origin (default: https://www.febbox.com)
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Share key used when a caller omits one
    #[serde(default = "default_share_key")]
    pub default_share_key: String,
    /// Session cookie sent as `ui=<token>`
    #[serde(default)]
    pub ui_cookie: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u32,
    /// Lifetime of cached file listings (default: 10 minutes)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Interval between expired-entry sweeps (default: 20 minutes)
    #[serde(default = "default_cache_sweep")]
    pub cache_sweep_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            default_share_key: default_share_key(),
            ui_cookie: String::new(),
            user_agent: default_user_agent(),
            timeout_secs: default_upstream_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            cache_sweep_secs: default_cache_sweep(),
        }
    }
}

fn default_upstream_url() -> String {
    "https://www.febbox.com".to_string()
}

fn default_share_key() -> String {
    "LofCen6W".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36".to_string()
}

fn default_upstream_timeout() -> u32 {
    30
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_cache_sweep() -> u64 {
    1200
}

/// Subtitle acquisition configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitleConfig {
    /// Subtitle index host (default: https://yts-subs.com)
    #[serde(default = "default_index_url")]
    pub index_base_url: String,
    /// Directory holding one sub-directory of converted tracks per fid
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Public path under which `storage_dir` is served
    #[serde(default = "default_public_path")]
    pub public_path: String,
    /// Timeout for each outbound request in seconds (default: 10)
    #[serde(default = "default_subtitle_timeout")]
    pub timeout_secs: u32,
    /// Upper bound on a single candidate's fetch/convert task (default: 60)
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u32,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            index_base_url: default_index_url(),
            storage_dir: default_storage_dir(),
            public_path: default_public_path(),
            timeout_secs: default_subtitle_timeout(),
            task_timeout_secs: default_task_timeout(),
        }
    }
}

fn default_index_url() -> String {
    "https://yts-subs.com".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("subtitles")
}

fn default_public_path() -> String {
    "/subtitles".to_string()
}

fn default_subtitle_timeout() -> u32 {
    10
}

fn default_task_timeout() -> u32 {
    60
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub upstream: SanitizedUpstreamConfig,
    pub subtitles: SubtitleConfig,
}

/// Upstream config with the session cookie hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub base_url: String,
    pub default_share_key: String,
    pub ui_cookie_configured: bool,
    pub timeout_secs: u32,
    pub cache_ttl_secs: u64,
    pub cache_sweep_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            upstream: SanitizedUpstreamConfig {
                base_url: config.upstream.base_url.clone(),
                default_share_key: config.upstream.default_share_key.clone(),
                ui_cookie_configured: !config.upstream.ui_cookie.is_empty(),
                timeout_secs: config.upstream.timeout_secs,
                cache_ttl_secs: config.upstream.cache_ttl_secs,
                cache_sweep_secs: config.upstream.cache_sweep_secs,
            },
            subtitles: config.subtitles.clone(),
        }
    }
}
