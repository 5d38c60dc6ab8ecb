//! Startup orchestration.
//!
//! # Responsibilities
//! - Load persisted state (rate limiter, live and backup caches)
//! - Initialize all subsystems in dependency order
//! - Start background tasks (scheduler, heartbeat) and the HTTP server
//!
//! # Design Decisions
//! - Corrupt or missing state never fails startup; it falls back to defaults
//! - Connection health always starts as `unknown`
//! - Listeners start last (traffic only when ready)

use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::cache::CacheStore;
use crate::config::CacherConfig;
use crate::events::EventBroadcaster;
use crate::fetcher::{FetchScheduler, FetchStats, RateLimiter, RatePolicy, SchedulerHandles, UpstreamError};
use crate::health::{ConnectionHealth, HealthStateMachine, HealthTracker};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("HTTP server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Fully wired application, ready to run.
pub struct Application {
    scheduler: FetchScheduler,
    state: AppState,
    config_rx: mpsc::UnboundedReceiver<CacherConfig>,
    heartbeat_interval: std::time::Duration,
}

impl Application {
    /// Load persisted state and wire every subsystem.
    pub fn build(config: CacherConfig, shutdown: Shutdown) -> Result<Self, StartupError> {
        let now = Utc::now();
        let storage = &config.storage;

        let limiter = RateLimiter::load(storage.state_path(), RatePolicy::from_config(&config.schedule), now);
        let cache = Arc::new(CacheStore::load(storage.cache_path(), storage.backup_path(), now));
        let health = Arc::new(HealthTracker::new(ConnectionHealth::new(now)));
        let machine = HealthStateMachine::new(config.health.connection_failure_threshold, now);
        let events = EventBroadcaster::new(config.events.channel_capacity, health.clone());
        let stats = Arc::new(FetchStats::default());
        let shared_config = Arc::new(ArcSwap::from_pointee(config.clone()));
        let (config_tx, config_rx) = mpsc::unbounded_channel();

        tracing::info!(
            state_dir = %storage.state_dir.display(),
            last_call_time = ?limiter.last_call_time(),
            live_cached = cache.get_live().is_some(),
            backup_cached = cache.get_backup().is_some(),
            "Persisted state loaded"
        );

        let state = AppState {
            config: shared_config.clone(),
            cache: cache.clone(),
            health: health.clone(),
            events: events.clone(),
            stats: stats.clone(),
            limiter: limiter.view(),
            config_tx,
            shutdown,
            started_at: now,
        };

        let heartbeat_interval = std::time::Duration::from_secs(config.events.heartbeat_interval_seconds);
        let handles = SchedulerHandles {
            config: shared_config,
            cache,
            health,
            events,
            stats,
        };
        let scheduler = FetchScheduler::new(config, limiter, machine, handles)?;

        Ok(Self {
            scheduler,
            state,
            config_rx,
            heartbeat_interval,
        })
    }

    /// Handle the config watcher pushes reloads into.
    pub fn config_sender(&self) -> mpsc::UnboundedSender<CacherConfig> {
        self.state.config_tx.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Spawn the scheduler and heartbeat, then serve until shutdown.
    pub async fn run(self, listener: TcpListener) -> Result<(), StartupError> {
        let shutdown = self.state.shutdown.clone();

        let scheduler = tokio::spawn(self.scheduler.run(self.config_rx, shutdown.subscribe()));
        let heartbeat = tokio::spawn(
            self.state
                .events
                .clone()
                .run_heartbeat(self.heartbeat_interval, shutdown.subscribe()),
        );

        let served = HttpServer::new(self.state).run(listener, shutdown.subscribe()).await;
        if served.is_err() {
            // Bring the background tasks down with the server.
            shutdown.trigger();
        }

        for (name, task) in [("scheduler", scheduler), ("heartbeat", heartbeat)] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "Background task panicked");
            }
        }

        served?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
