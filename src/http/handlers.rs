//! Query API handlers.
//!
//! All reads are lock-free snapshots of state owned by the fetch scheduler.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::cache::CacheInfo;
use crate::config::{validate_config, CacherConfig, PublicConfig, ValidationError};
use crate::fetcher::{FetchStatsSnapshot, RatePolicy};
use crate::health::StatusSnapshot;
use crate::http::server::AppState;

/// Response header naming which cached copy served `/data`.
pub const X_CACHE_COPY: &str = "x-cache-copy";

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub enabled: bool,
    pub min_interval_seconds: u64,
    pub last_call_time: Option<chrono::DateTime<Utc>>,
    pub seconds_until_allowed: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiInfo {
    pub description: String,
    pub test_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub api: ApiInfo,
    pub connection: StatusSnapshot,
    pub rate_limit: RateLimitStatus,
    pub stats: FetchStatsSnapshot,
    pub config: PublicConfig,
    pub cache: CacheInfo,
    pub event_subscribers: usize,
}

/// Fields a client may change through `POST /config`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdate {
    pub fetch_interval_seconds: Option<u64>,
    pub rate_limit_enabled: Option<bool>,
    pub api_description: Option<String>,
    #[serde(alias = "api_endpoint")]
    pub endpoint_url: Option<Value>,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.fetch_interval_seconds.is_none()
            && self.rate_limit_enabled.is_none()
            && self.api_description.is_none()
            && self.endpoint_url.is_none()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub async fn root() -> Redirect {
    Redirect::temporary("/status")
}

/// Live payload, falling back to the backup copy.
pub async fn get_data(State(state): State<AppState>) -> Response {
    if let Some(entry) = state.cache.get_live() {
        return ([(X_CACHE_COPY, "live")], Json(entry.payload.clone())).into_response();
    }

    match state.cache.get_backup() {
        Some(entry) => {
            tracing::info!("Live cache empty, serving backup payload");
            ([(X_CACHE_COPY, "backup")], Json(entry.payload.clone())).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No data available"),
    }
}

pub async fn get_backup(State(state): State<AppState>) -> Response {
    match state.cache.get_backup() {
        Some(entry) => Json(Arc::unwrap_or_clone(entry)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No backup available"),
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let now = Utc::now();
    let config = state.config.load();
    let policy = RatePolicy::from_config(&config.schedule);
    let last_call_time = state.limiter.last_call_time();

    Json(ServiceStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (now - state.started_at).num_seconds().max(0),
        api: ApiInfo {
            description: config.upstream.api_description.clone(),
            test_mode: config.upstream.test_mode,
        },
        connection: state.health.snapshot().snapshot(),
        rate_limit: RateLimitStatus {
            enabled: policy.enabled,
            min_interval_seconds: policy.min_interval.as_secs(),
            last_call_time,
            seconds_until_allowed: policy.time_until_allowed(last_call_time, now).as_secs(),
        },
        stats: state.stats.snapshot(),
        config: config.public_view(),
        cache: state.cache.info(now),
        event_subscribers: state.events.subscriber_count(),
    })
}

pub async fn get_connection_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.health.snapshot().snapshot())
}

pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(state.config.load().public_view())
}

pub async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> Response {
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected malformed config update");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    if update.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No data provided");
    }
    if update.endpoint_url.is_some() {
        tracing::warn!("Client attempted to change the upstream endpoint, rejected");
        return error_response(
            StatusCode::FORBIDDEN,
            "Updating the API endpoint via the API is not allowed",
        );
    }

    let mut config = CacherConfig::clone(&state.config.load());
    if let Some(interval) = update.fetch_interval_seconds {
        config.schedule.fetch_interval_seconds = interval;
    }
    if let Some(enabled) = update.rate_limit_enabled {
        config.schedule.rate_limit_enabled = enabled;
    }
    if let Some(description) = update.api_description {
        config.upstream.api_description = description;
    }

    if let Err(errors) = validate_config(&config) {
        let messages: Vec<String> = errors.iter().map(ValidationError::to_string).collect();
        tracing::warn!(errors = ?messages, "Rejected invalid config update");
        return error_response(StatusCode::BAD_REQUEST, messages.join("; "));
    }

    let public = config.public_view();
    state.config.store(Arc::new(config.clone()));
    if state.config_tx.send(config).is_err() {
        tracing::error!("Fetch scheduler is not running, config update stored but not applied");
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Fetch scheduler is not running");
    }

    tracing::info!(
        fetch_interval_secs = public.fetch_interval_seconds,
        rate_limit_enabled = public.rate_limit_enabled,
        "Configuration updated via API"
    );
    Json(json!({
        "message": "Configuration updated successfully",
        "config": public,
    }))
    .into_response()
}
