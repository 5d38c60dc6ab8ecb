//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the cacher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the API cacher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacherConfig {
    /// Upstream API endpoint and authentication.
    pub upstream: UpstreamConfig,

    /// Fetch cadence and rate limiting.
    pub schedule: ScheduleConfig,

    /// Connection health thresholds.
    pub health: HealthConfig,

    /// Event broadcast settings.
    pub events: EventsConfig,

    /// Durable state file locations.
    pub storage: StorageConfig,

    /// Local query API listener.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Response diagnostics.
    pub diagnostics: DiagnosticsConfig,
}

impl CacherConfig {
    /// Configuration with every sensitive field removed, safe to hand to clients.
    pub fn public_view(&self) -> PublicConfig {
        PublicConfig {
            api_description: self.upstream.api_description.clone(),
            api_header_type: self.upstream.api_header_type.clone(),
            request_timeout_seconds: self.upstream.request_timeout_seconds,
            test_mode: self.upstream.test_mode,
            fetch_interval_seconds: self.schedule.fetch_interval_seconds,
            rate_limit_enabled: self.schedule.rate_limit_enabled,
            min_time_between_api_calls_seconds: self.schedule.min_interval_secs(),
            connection_failure_threshold: self.health.connection_failure_threshold,
            heartbeat_interval_seconds: self.events.heartbeat_interval_seconds,
            log_level: self.observability.log_level.clone(),
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Target URL polled on every fetch cycle.
    pub endpoint_url: String,

    /// Optional API key sent with each request.
    pub api_key: Option<String>,

    /// How the key is attached: `bearer`, `basic`, `x-access-token` or a custom header name.
    pub api_header_type: String,

    /// Human readable label shown on the status page.
    pub api_description: String,

    /// Hard upper bound for a single upstream call.
    pub request_timeout_seconds: u64,

    /// Serve generated sample data instead of calling the endpoint.
    pub test_mode: bool,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "https://api.example.com/v1/data".to_string(),
            api_key: None,
            api_header_type: "bearer".to_string(),
            api_description: "API".to_string(),
            request_timeout_seconds: 30,
            test_mode: false,
        }
    }
}

/// Fetch cadence and rate limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Interval between scheduled fetch cycles.
    pub fetch_interval_seconds: u64,

    /// Enforce the minimum spacing between upstream calls.
    pub rate_limit_enabled: bool,

    /// Minimum spacing between upstream calls (defaults to the fetch interval).
    pub min_time_between_api_calls_seconds: Option<u64>,
}

impl ScheduleConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_seconds)
    }

    /// Effective minimum spacing between calls in seconds.
    pub fn min_interval_secs(&self) -> u64 {
        self.min_time_between_api_calls_seconds
            .unwrap_or(self.fetch_interval_seconds)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fetch_interval_seconds: 300,
            rate_limit_enabled: true,
            min_time_between_api_calls_seconds: None,
        }
    }
}

/// Connection health configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Number of consecutive persistent failures before reporting disconnected.
    pub connection_failure_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            connection_failure_threshold: 3,
        }
    }
}

/// Event broadcast configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Interval between heartbeat events.
    pub heartbeat_interval_seconds: u64,

    /// Events buffered per subscriber before the oldest are dropped.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: 30,
            channel_capacity: 64,
        }
    }
}

/// Durable state locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding every state file.
    pub state_dir: PathBuf,

    /// Rate limiter state file name.
    pub state_file: String,

    /// Live cache file name.
    pub cache_file: String,

    /// Backup cache file name.
    pub backup_file: String,
}

impl StorageConfig {
    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join(&self.state_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.state_dir.join(&self.cache_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.state_dir.join(&self.backup_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("."),
            state_file: "fetcher_state.json".to_string(),
            cache_file: "cached_data.json".to_string(),
            backup_file: "last_successful_response.json".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Response diagnostics.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// JSON path (`$.a.b[0]`) or regular expression extracted from each response and logged.
    pub log_response_filter: Option<String>,
}

/// The non-sensitive subset of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicConfig {
    pub api_description: String,
    pub api_header_type: String,
    pub request_timeout_seconds: u64,
    pub test_mode: bool,
    pub fetch_interval_seconds: u64,
    pub rate_limit_enabled: bool,
    pub min_time_between_api_calls_seconds: u64,
    pub connection_failure_threshold: u32,
    pub heartbeat_interval_seconds: u64,
    pub log_level: String,
}
