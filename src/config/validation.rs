//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every violation is collected
//! so an operator sees all problems at once.

use thiserror::Error;
use url::Url;

use crate::config::schema::CacherConfig;
use crate::fetcher::auth::HeaderStyle;
use crate::fetcher::filter::ResponseFilter;

/// Smallest accepted fetch interval.
pub const MIN_FETCH_INTERVAL_SECS: u64 = 10;

/// Largest accepted interval, timeout or heartbeat period (30 days).
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("fetch_interval_seconds must be at least {min} seconds (got {0})", min = MIN_FETCH_INTERVAL_SECS)]
    FetchIntervalTooShort(u64),

    #[error("{field} must be at most {max} seconds (got {value})", max = MAX_DURATION_SECS)]
    DurationTooLong { field: &'static str, value: u64 },

    #[error("connection_failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("request_timeout_seconds must be at least 1")]
    ZeroRequestTimeout,

    #[error("endpoint_url '{url}' is invalid: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("api_header_type must not be empty")]
    EmptyHeaderType,

    #[error("api_header_type '{0}' is not a valid header name")]
    InvalidHeaderType(String),

    #[error("log_response_filter is invalid: {0}")]
    InvalidResponseFilter(String),

    #[error("events.channel_capacity must be at least 1")]
    ZeroChannelCapacity,

    #[error("events.heartbeat_interval_seconds must be at least 1")]
    ZeroHeartbeatInterval,
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &CacherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.schedule.fetch_interval_seconds < MIN_FETCH_INTERVAL_SECS {
        errors.push(ValidationError::FetchIntervalTooShort(
            config.schedule.fetch_interval_seconds,
        ));
    }

    let durations = [
        ("fetch_interval_seconds", Some(config.schedule.fetch_interval_seconds)),
        (
            "min_time_between_api_calls_seconds",
            config.schedule.min_time_between_api_calls_seconds,
        ),
        ("request_timeout_seconds", Some(config.upstream.request_timeout_seconds)),
        ("heartbeat_interval_seconds", Some(config.events.heartbeat_interval_seconds)),
    ];
    for (field, value) in durations {
        if let Some(value) = value.filter(|v| *v > MAX_DURATION_SECS) {
            errors.push(ValidationError::DurationTooLong { field, value });
        }
    }

    if config.health.connection_failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }

    if config.upstream.request_timeout_seconds == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if let Err(reason) = check_endpoint(&config.upstream.endpoint_url) {
        errors.push(ValidationError::InvalidEndpoint {
            url: config.upstream.endpoint_url.clone(),
            reason,
        });
    }

    let header_type = &config.upstream.api_header_type;
    if header_type.trim().is_empty() {
        errors.push(ValidationError::EmptyHeaderType);
    } else if HeaderStyle::parse(header_type).is_err() {
        errors.push(ValidationError::InvalidHeaderType(header_type.clone()));
    }

    if let Some(filter) = &config.diagnostics.log_response_filter {
        if let Err(e) = ResponseFilter::parse(filter) {
            errors.push(ValidationError::InvalidResponseFilter(e.to_string()));
        }
    }

    if config.events.channel_capacity == 0 {
        errors.push(ValidationError::ZeroChannelCapacity);
    }

    if config.events.heartbeat_interval_seconds == 0 {
        errors.push(ValidationError::ZeroHeartbeatInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
