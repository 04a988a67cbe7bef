//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        errors.push("backend.base_url must not be empty".to_string());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push("backend.base_url must start with http:// or https://".to_string());
    }
    if config.backend.timeout_secs == 0 {
        errors.push("backend.timeout_secs must be > 0".to_string());
    }

    if config.engine.default_llm.trim().is_empty() {
        errors.push("engine.default_llm must not be empty".to_string());
    }
    if config.engine.placeholder_title.trim().is_empty() {
        errors.push("engine.placeholder_title must not be empty".to_string());
    }
    if config.engine.title_prefix_chars == 0 {
        errors.push("engine.title_prefix_chars must be > 0".to_string());
    }
    if config.engine.dedup_window_ms == 0 {
        errors.push("engine.dedup_window_ms must be > 0".to_string());
    }

    if config.identity.uid.trim().is_empty() {
        errors.push("identity.uid must not be empty".to_string());
    }

    if !matches!(config.logging.format.to_lowercase().as_str(), "text" | "json") {
        errors.push("logging.format must be one of: text, json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
    }
}
