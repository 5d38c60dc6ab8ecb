//! Configuration loading from disk and environment.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::CacherConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a configuration file, apply process environment overrides, and validate.
///
/// A missing file is not an error: defaults plus environment are used instead.
pub fn load_config(path: &Path) -> Result<CacherConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] but with an explicit environment lookup.
pub fn load_config_with<F>(path: &Path, env: F) -> Result<CacherConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            CacherConfig::default()
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };

    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a configuration.
///
/// Unparsable values are logged and ignored.
pub fn apply_env_overrides<F>(config: &mut CacherConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("ENDPOINT_URL") {
        config.upstream.endpoint_url = url;
    }
    if let Some(key) = env("API_KEY").filter(|k| !k.is_empty()) {
        config.upstream.api_key = Some(key);
    }
    if let Some(header) = env("API_HEADER_TYPE") {
        config.upstream.api_header_type = header;
    }
    if let Some(description) = env("API_DESCRIPTION") {
        config.upstream.api_description = description;
    }
    if let Some(v) = parse_env::<u64>(&env, "REQUEST_TIMEOUT_SECONDS") {
        config.upstream.request_timeout_seconds = v;
    }
    if let Some(flag) = env("TEST_MODE") {
        config.upstream.test_mode = parse_flag(&flag);
    }
    if let Some(v) = parse_env::<u64>(&env, "FETCH_INTERVAL_SECONDS") {
        config.schedule.fetch_interval_seconds = v;
    }
    if let Some(flag) = env("RATE_LIMIT_ENABLED") {
        config.schedule.rate_limit_enabled = parse_flag(&flag);
    }
    if let Some(v) = parse_env::<u64>(&env, "MIN_TIME_BETWEEN_API_CALLS_SECONDS") {
        config.schedule.min_time_between_api_calls_seconds = Some(v);
    }
    if let Some(v) = parse_env::<u32>(&env, "CONNECTION_FAILURE_THRESHOLD") {
        config.health.connection_failure_threshold = v;
    }
    if let Some(filter) = env("LOG_RESPONSE_FILTER").filter(|f| !f.is_empty()) {
        config.diagnostics.log_response_filter = Some(filter);
    }
    if let Some(level) = env("LOG_LEVEL") {
        config.observability.log_level = level.to_lowercase();
    }
    if let Some(port) = parse_env::<u16>(&env, "PORT") {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::error!(key, value = %raw, "Invalid value in environment, ignoring");
            None
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
