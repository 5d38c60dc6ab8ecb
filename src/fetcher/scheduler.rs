//! Fetch cycle scheduler.
//!
//! The single writer of rate limiter state, connection health and the cache.
//! One cycle: rate limit gate → record attempt → fetch → classify → cache on
//! success → health state machine → broadcast transition.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant as TokioInstant};

use crate::cache::{CacheStore, FetchMeta};
use crate::config::CacherConfig;
use crate::events::{CacherEvent, EventBroadcaster};
use crate::fetcher::classifier::{classify, FetchOutcome};
use crate::fetcher::filter::ResponseFilter;
use crate::fetcher::rate_limiter::{RateLimiter, RatePolicy};
use crate::fetcher::stats::FetchStats;
use crate::fetcher::upstream::{UpstreamClient, UpstreamError};
use crate::health::{HealthStateMachine, HealthTracker, StatusChangeEvent};
use crate::observability::metrics;

/// Lower bound on any reschedule delay.
const MIN_RESCHEDULE: Duration = Duration::from_millis(100);

/// Upper bound on any single sleep; unvalidated intervals are clamped to it.
const MAX_RESCHEDULE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// The rate limiter refused; nothing else ran.
    Skipped { wait: Duration },
    /// An upstream attempt was made.
    Attempted {
        outcome: &'static str,
        transition: Option<StatusChangeEvent>,
    },
}

/// Handles shared between the scheduler and serving code.
#[derive(Clone)]
pub struct SchedulerHandles {
    pub config: Arc<ArcSwap<CacherConfig>>,
    pub cache: Arc<CacheStore>,
    pub health: Arc<HealthTracker>,
    pub events: EventBroadcaster,
    pub stats: Arc<FetchStats>,
}

pub struct FetchScheduler {
    config: CacherConfig,
    limiter: RateLimiter,
    upstream: UpstreamClient,
    machine: HealthStateMachine,
    filter: Option<ResponseFilter>,
    handles: SchedulerHandles,
}

impl FetchScheduler {
    pub fn new(
        config: CacherConfig,
        limiter: RateLimiter,
        machine: HealthStateMachine,
        handles: SchedulerHandles,
    ) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::from_config(&config.upstream)?;
        let filter = build_filter(&config);

        Ok(Self {
            config,
            limiter,
            upstream,
            machine,
            filter,
            handles,
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn machine(&self) -> &HealthStateMachine {
        &self.machine
    }

    pub fn handles(&self) -> &SchedulerHandles {
        &self.handles
    }

    /// Run cycles until shutdown. Individual cycle failures never end the loop.
    pub async fn run(
        mut self,
        mut config_updates: mpsc::UnboundedReceiver<CacherConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let initial_wait = self.limiter.time_until_allowed(Utc::now());
        tracing::info!(
            endpoint = %self.upstream.endpoint(),
            fetch_interval_secs = self.config.schedule.fetch_interval_seconds,
            rate_limit_enabled = self.limiter.policy().enabled,
            first_fetch_in_secs = initial_wait.as_secs_f64(),
            "Fetch scheduler starting"
        );

        let mut next_run = deadline_after(initial_wait);

        loop {
            tokio::select! {
                _ = sleep_until(next_run) => {
                    let report = self.run_cycle(Utc::now()).await;
                    let delay = self.next_delay(&report);
                    tracing::debug!(delay_secs = delay.as_secs_f64(), "Next fetch cycle scheduled");
                    next_run = deadline_after(delay);
                }
                Some(new_config) = config_updates.recv() => {
                    self.apply_config(new_config);
                    // A shorter interval takes effect without waiting out the old one.
                    next_run = next_run.min(deadline_after(self.config.schedule.fetch_interval()));
                }
                _ = shutdown.recv() => {
                    tracing::info!("Fetch scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Execute one cycle at `now`.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        if !self.limiter.may_fetch_now(now) {
            let wait = self.limiter.time_until_allowed(now);
            self.handles.stats.record_skip();
            metrics::record_cycle_skipped();
            tracing::info!(wait_secs = wait.as_secs_f64(), "Rate limit in effect, skipping fetch cycle");
            return CycleReport::Skipped { wait };
        }

        // The attempt consumes the budget before the request leaves.
        if let Err(e) = self.limiter.record_attempt(now) {
            tracing::warn!(error = %e, "Failed to persist rate limiter state");
        }
        self.handles.stats.record_call();

        tracing::info!(endpoint = %self.upstream.endpoint(), "Fetching upstream data");
        let start_time = Instant::now();
        let outcome = classify(self.upstream.fetch().await);
        metrics::record_fetch_attempt(outcome.label(), start_time);

        let completed = Utc::now().max(now);
        self.record_outcome(&outcome, completed);

        let transition = self.machine.apply(&outcome, completed);
        self.handles.health.publish(self.machine.health().clone());

        if let Some(event) = &transition {
            if event.status == crate::health::ConnectionStatus::Disconnected {
                tracing::warn!(
                    previous = %event.previous_status,
                    consecutive_failures = event.consecutive_failures,
                    "Upstream connection marked disconnected"
                );
            } else {
                tracing::info!(previous = %event.previous_status, status = %event.status, "Upstream connection status changed");
            }
            self.handles
                .events
                .publish(CacherEvent::ConnectionStatusChange(event.clone()));
        }

        CycleReport::Attempted {
            outcome: outcome.label(),
            transition,
        }
    }

    fn record_outcome(&self, outcome: &FetchOutcome, now: DateTime<Utc>) {
        match outcome {
            FetchOutcome::Success { payload, status_code } => {
                self.handles.stats.record_success();

                if let Some(filter) = &self.filter {
                    match filter.extract(payload) {
                        Some(value) => tracing::info!(filter = filter.describe(), value = %value, "Response filter matched"),
                        None => tracing::info!(filter = filter.describe(), "Response filter matched nothing"),
                    }
                }

                let meta = FetchMeta {
                    source: Some(self.upstream.source_label().to_string()),
                    status_code: Some(*status_code),
                };
                match self.handles.cache.put(payload.clone(), meta, now) {
                    Ok(entry) => tracing::info!(changed = entry.changed, "Upstream data cached"),
                    Err(e) => tracing::error!(error = %e, "Upstream data cached in memory but not persisted"),
                }
            }
            FetchOutcome::TransientFailure { reason } => {
                self.handles.stats.record_failure();
                tracing::warn!(reason = %reason, "Transient upstream failure, not counted toward disconnection");
            }
            FetchOutcome::PersistentFailure { reason } => {
                self.handles.stats.record_failure();
                tracing::error!(
                    reason = %reason,
                    consecutive_failures = self.machine.health().consecutive_failures + 1,
                    threshold = self.machine.threshold(),
                    "Upstream fetch failed"
                );
            }
        }
    }

    /// Delay until the next cycle after `report`.
    pub fn next_delay(&self, report: &CycleReport) -> Duration {
        let delay = match report {
            CycleReport::Skipped { wait } => *wait,
            CycleReport::Attempted { .. } => self.config.schedule.fetch_interval(),
        };
        delay.clamp(MIN_RESCHEDULE, MAX_RESCHEDULE)
    }

    /// Swap in a new configuration at a cycle boundary.
    pub fn apply_config(&mut self, config: CacherConfig) {
        match UpstreamClient::from_config(&config.upstream) {
            Ok(upstream) => self.upstream = upstream,
            Err(e) => {
                tracing::error!(error = %e, "Rejected config update, keeping current configuration");
                return;
            }
        }

        self.limiter.set_policy(RatePolicy::from_config(&config.schedule));
        self.machine.set_threshold(config.health.connection_failure_threshold);
        self.filter = build_filter(&config);

        tracing::info!(
            fetch_interval_secs = config.schedule.fetch_interval_seconds,
            threshold = config.health.connection_failure_threshold,
            "Applied configuration update"
        );
        self.handles.config.store(Arc::new(config.clone()));
        self.config = config;
    }
}

/// Deadline `delay` from now, clamped so it can never overflow the clock.
fn deadline_after(delay: Duration) -> TokioInstant {
    let now = TokioInstant::now();
    now.checked_add(delay.min(MAX_RESCHEDULE)).unwrap_or(now)
}

fn build_filter(config: &CacherConfig) -> Option<ResponseFilter> {
    let raw = config.diagnostics.log_response_filter.as_deref()?;
    match ResponseFilter::parse(raw) {
        Ok(filter) => Some(filter),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid log_response_filter");
            None
        }
    }
}
