//! Shared, lock-free view of connection health.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::health::state::ConnectionHealth;
use crate::observability::metrics;

/// Holds the latest published health. The scheduler stores, everyone else loads.
#[derive(Debug)]
pub struct HealthTracker {
    current: ArcSwap<ConnectionHealth>,
}

impl HealthTracker {
    pub fn new(initial: ConnectionHealth) -> Self {
        metrics::record_connection_health(&initial);
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Consistent snapshot; never blocks on the writer.
    pub fn snapshot(&self) -> Arc<ConnectionHealth> {
        self.current.load_full()
    }

    pub fn publish(&self, health: ConnectionHealth) {
        metrics::record_connection_health(&health);
        self.current.store(Arc::new(health));
    }
}
