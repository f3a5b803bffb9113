use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upstream and subtitle index URLs are set
/// - Timeouts and cache lifetimes are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.upstream.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.base_url cannot be empty".to_string(),
        ));
    }

    if config.upstream.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "upstream.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.upstream.cache_ttl_secs == 0 || config.upstream.cache_sweep_secs == 0 {
        return Err(ConfigError::ValidationError(
            "upstream cache lifetimes cannot be 0".to_string(),
        ));
    }

    if config.subtitles.index_base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "subtitles.index_base_url cannot be empty".to_string(),
        ));
    }

    if config.subtitles.timeout_secs == 0 || config.subtitles.task_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "subtitle timeouts cannot be 0".to_string(),
        ));
    }

    if !config.subtitles.public_path.starts_with('/') {
        return Err(ConfigError::ValidationError(
            "subtitles.public_path must start with '/'".to_string(),
        ));
    }

    Ok(())
}
