//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cacher_fetch_attempts_total` (counter): upstream attempts by outcome
//! - `cacher_fetch_duration_seconds` (histogram): upstream call latency
//! - `cacher_cycles_skipped_total` (counter): cycles skipped by the rate limiter
//! - `cacher_connection_status` (gauge): 0=unknown, 1=connected, 2=disconnected
//! - `cacher_consecutive_failures` (gauge)
//! - `cacher_event_subscribers` (gauge): live event stream subscribers
//! - `cacher_events_published_total` (counter): broadcast events by name
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::health::state::ConnectionHealth;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_fetch_attempt(outcome: &'static str, start_time: Instant) {
    counter!("cacher_fetch_attempts_total", "outcome" => outcome).increment(1);
    histogram!("cacher_fetch_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_cycle_skipped() {
    counter!("cacher_cycles_skipped_total").increment(1);
}

pub fn record_connection_health(health: &ConnectionHealth) {
    gauge!("cacher_connection_status").set(health.status as u8 as f64);
    gauge!("cacher_consecutive_failures").set(health.consecutive_failures as f64);
}

pub fn record_subscriber_joined() {
    gauge!("cacher_event_subscribers").increment(1.0);
}

pub fn record_subscriber_left() {
    gauge!("cacher_event_subscribers").decrement(1.0);
}

pub fn record_event_published(event: &'static str) {
    counter!("cacher_events_published_total", "event" => event).increment(1);
}
