//! Persistent minimum-interval rate limiter.
//!
//! Every upstream attempt, successful or not, consumes the budget. The last
//! attempt time is written to disk before the call goes out, so a restart
//! never shortens the wait.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScheduleConfig;
use crate::storage::{read_json, write_json_atomic, StorageError};

/// Durable rate limiter record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterState {
    /// Start of the most recent upstream attempt.
    pub last_call_time: Option<DateTime<Utc>>,
}

/// Spacing rules resolved from the schedule configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub enabled: bool,
    pub min_interval: Duration,
}

impl RatePolicy {
    pub fn from_config(schedule: &ScheduleConfig) -> Self {
        Self {
            enabled: schedule.rate_limit_enabled,
            min_interval: Duration::from_secs(schedule.min_interval_secs()),
        }
    }

    /// Time left before a call is permitted, zero if permitted now.
    pub fn time_until_allowed(&self, last_call: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        match last_call {
            None => Duration::ZERO,
            Some(last) => {
                // A negative delta (clock stepped back) counts as no time elapsed.
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                self.min_interval.saturating_sub(elapsed)
            }
        }
    }

    pub fn permits(&self, last_call: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.time_until_allowed(last_call, now).is_zero()
    }
}

/// Read-only handle onto the limiter state for serving code.
#[derive(Debug, Clone)]
pub struct RateLimiterView {
    state: Arc<ArcSwap<RateLimiterState>>,
}

impl RateLimiterView {
    pub fn last_call_time(&self) -> Option<DateTime<Utc>> {
        self.state.load().last_call_time
    }
}

/// The rate limiter owned by the scheduler.
#[derive(Debug)]
pub struct RateLimiter {
    state: Arc<ArcSwap<RateLimiterState>>,
    policy: RatePolicy,
    path: PathBuf,
}

impl RateLimiter {
    /// A limiter with no recorded attempts.
    pub fn new(path: impl Into<PathBuf>, policy: RatePolicy) -> Self {
        Self {
            state: Arc::new(ArcSwap::from_pointee(RateLimiterState::default())),
            policy,
            path: path.into(),
        }
    }

    /// Load persisted state. Missing or corrupt files start from an empty state.
    ///
    /// A persisted time in the future is clamped to `now` so a skewed clock
    /// cannot block fetching for longer than one interval.
    pub fn load(path: impl Into<PathBuf>, policy: RatePolicy, now: DateTime<Utc>) -> Self {
        let path = path.into();
        let mut state = match read_json::<RateLimiterState>(&path) {
            Ok(Some(state)) => {
                tracing::info!(path = %path.display(), last_call_time = ?state.last_call_time, "Loaded rate limiter state");
                state
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No rate limiter state found, first fetch is unrestricted");
                RateLimiterState::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rate limiter state unreadable, treating as unset");
                RateLimiterState::default()
            }
        };

        if let Some(last) = state.last_call_time {
            if last > now {
                tracing::warn!(last_call_time = %last, now = %now, "Persisted call time is in the future, clamping");
                state.last_call_time = Some(now);
            }
        }

        Self {
            state: Arc::new(ArcSwap::from_pointee(state)),
            policy,
            path,
        }
    }

    pub fn view(&self) -> RateLimiterView {
        RateLimiterView {
            state: self.state.clone(),
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RatePolicy) {
        if policy != self.policy {
            tracing::info!(
                enabled = policy.enabled,
                min_interval_secs = policy.min_interval.as_secs(),
                "Rate limit policy updated"
            );
        }
        self.policy = policy;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_call_time(&self) -> Option<DateTime<Utc>> {
        self.state.load().last_call_time
    }

    /// Whether a new upstream attempt may begin at `now`.
    pub fn may_fetch_now(&self, now: DateTime<Utc>) -> bool {
        self.policy.permits(self.last_call_time(), now)
    }

    pub fn time_until_allowed(&self, now: DateTime<Utc>) -> Duration {
        self.policy.time_until_allowed(self.last_call_time(), now)
    }

    /// Record an attempt at `now` and persist it.
    ///
    /// The in-memory state is updated even if persisting fails.
    pub fn record_attempt(&mut self, now: DateTime<Utc>) -> Result<(), StorageError> {
        let state = RateLimiterState {
            last_call_time: Some(now),
        };
        self.state.store(Arc::new(state.clone()));
        write_json_atomic(&self.path, &state)
    }
}
