//! Fan-out of health events to live subscribers.

use chrono::Utc;
use futures_util::stream::{self, Stream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::events::types::{CacherEvent, Heartbeat};
use crate::health::tracker::HealthTracker;
use crate::observability::metrics;

/// Publishes events to every current subscriber.
///
/// Each subscriber owns a bounded ring buffer; when it falls behind the oldest
/// events are dropped for that subscriber alone.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<CacherEvent>,
    health: Arc<HealthTracker>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize, health: Arc<HealthTracker>) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, health }
    }

    /// Open a subscription whose first event is the current status.
    pub fn subscribe(&self) -> Subscription {
        // Subscribe before reading health so no later change can slip past.
        let rx = self.tx.subscribe();
        let snapshot = self.health.snapshot().snapshot();
        let id = Uuid::new_v4();

        metrics::record_subscriber_joined();
        tracing::debug!(subscriber = %id, subscribers = self.tx.receiver_count(), "Event subscriber joined");

        Subscription {
            id,
            initial: Some(CacherEvent::ConnectionStatus(snapshot)),
            rx,
        }
    }

    /// Deliver `event` to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: CacherEvent) -> usize {
        metrics::record_event_published(event.name());
        // An error only means nobody is listening.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish heartbeats every `interval` until shutdown.
    pub async fn run_heartbeat(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let start = Instant::now().checked_add(interval).unwrap_or_else(Instant::now);
        let mut ticker = time::interval_at(start, interval);
        tracing::info!(interval_secs = interval.as_secs(), "Heartbeat publisher starting");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let delivered = self.publish(CacherEvent::Heartbeat(Heartbeat { timestamp: Utc::now() }));
                    tracing::trace!(delivered, "Heartbeat published");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Heartbeat publisher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// One subscriber's event stream. Dropping it unsubscribes.
pub struct Subscription {
    id: Uuid,
    initial: Option<CacherEvent>,
    rx: broadcast::Receiver<CacherEvent>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<CacherEvent> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = %self.id, skipped, "Slow event subscriber, dropped events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = CacherEvent> + Send {
        stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|event| (event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        metrics::record_subscriber_left();
        tracing::debug!(subscriber = %self.id, "Event subscriber left");
    }
}
