//! Broadcaster behaviour driven by real fetch cycles.

mod common;

use std::sync::Arc;

use api_cacher::cache::CacheStore;
use api_cacher::events::{CacherEvent, EventBroadcaster};
use api_cacher::fetcher::{FetchScheduler, FetchStats, RateLimiter, RatePolicy, SchedulerHandles};
use api_cacher::health::{ConnectionHealth, ConnectionStatus, HealthStateMachine, HealthTracker};
use arc_swap::ArcSwap;
use chrono::Utc;
use common::{start_scripted_upstream, test_config};
use tempfile::TempDir;

#[tokio::test]
async fn test_late_joiner_sees_snapshot_before_changes() {
    let upstream = start_scripted_upstream(vec![(200, r#"{"ok":true}"#), (404, "gone")]).await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), &upstream.url());
    config.schedule.rate_limit_enabled = false;
    config.health.connection_failure_threshold = 2;

    let now = Utc::now();
    let health = Arc::new(HealthTracker::new(ConnectionHealth::new(now)));
    let events = EventBroadcaster::new(8, health.clone());
    let handles = SchedulerHandles {
        config: Arc::new(ArcSwap::from_pointee(config.clone())),
        cache: Arc::new(CacheStore::new(config.storage.cache_path(), config.storage.backup_path())),
        health,
        events: events.clone(),
        stats: Arc::new(FetchStats::default()),
    };
    let limiter = RateLimiter::new(config.storage.state_path(), RatePolicy::from_config(&config.schedule));
    let machine = HealthStateMachine::new(2, now);
    let mut scheduler = FetchScheduler::new(config, limiter, machine, handles).unwrap();

    let mut early = events.subscribe();
    scheduler.run_cycle(Utc::now()).await;

    // Joins after the unknown → connected transition was published.
    let mut late = events.subscribe();
    scheduler.run_cycle(Utc::now()).await;
    scheduler.run_cycle(Utc::now()).await;

    match late.recv().await.unwrap() {
        CacherEvent::ConnectionStatus(snapshot) => {
            assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);
        }
        other => panic!("expected snapshot first, got {:?}", other),
    }
    match late.recv().await.unwrap() {
        CacherEvent::ConnectionStatusChange(change) => {
            assert_eq!(change.previous_status, ConnectionStatus::Connected);
            assert_eq!(change.status, ConnectionStatus::Disconnected);
            assert_eq!(change.consecutive_failures, 2);
        }
        other => panic!("expected change, got {:?}", other),
    }

    let names: Vec<&str> = [
        early.recv().await.unwrap(),
        early.recv().await.unwrap(),
        early.recv().await.unwrap(),
    ]
    .iter()
    .map(CacherEvent::name)
    .collect();
    assert_eq!(
        names,
        vec!["connection_status", "connection_status_change", "connection_status_change"]
    );
}
