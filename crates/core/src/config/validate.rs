use super::{types::Config, ConfigError};

/// Validate configuration beyond what serde enforces.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let url = config.backend.url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError(
            "backend.url cannot be empty".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "backend.url must start with http:// or https://, got '{}'",
            url
        )));
    }
    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "backend.timeout_secs cannot be 0".to_string(),
        ));
    }

    if !(1..=100).contains(&config.search.page_limit) {
        return Err(ConfigError::ValidationError(format!(
            "search.page_limit must be between 1 and 100, got {}",
            config.search.page_limit
        )));
    }

    if config.suggestions.min_chars == 0 {
        return Err(ConfigError::ValidationError(
            "suggestions.min_chars cannot be 0".to_string(),
        ));
    }

    if config.monitor.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "monitor.poll_interval_ms cannot be 0".to_string(),
        ));
    }
    if config.monitor.ownership_tag.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "monitor.ownership_tag cannot be empty".to_string(),
        ));
    }

    Ok(())
}
