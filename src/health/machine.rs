//! Connection health state machine.
//!
//! # State Transitions
//! ```text
//! Unknown      → Connected:    any success
//! Unknown      → Disconnected: consecutive persistent failures >= threshold
//! Connected    → Disconnected: consecutive persistent failures >= threshold
//! Disconnected → Connected:    any success
//! ```
//!
//! Transient failures are observed but neither counted nor able to move the
//! state. Re-confirming the current status is silent.

use chrono::{DateTime, Utc};

use crate::fetcher::classifier::FetchOutcome;
use crate::health::state::{ConnectionHealth, ConnectionStatus, StatusChangeEvent};

#[derive(Debug, Clone)]
pub struct HealthStateMachine {
    health: ConnectionHealth,
    threshold: u32,
}

impl HealthStateMachine {
    pub fn new(threshold: u32, now: DateTime<Utc>) -> Self {
        Self::with_health(ConnectionHealth::new(now), threshold)
    }

    pub fn with_health(health: ConnectionHealth, threshold: u32) -> Self {
        Self {
            health,
            threshold: threshold.max(1),
        }
    }

    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = threshold.max(1);
    }

    /// Feed one classified outcome. Returns the transition event, if any.
    pub fn apply(&mut self, outcome: &FetchOutcome, now: DateTime<Utc>) -> Option<StatusChangeEvent> {
        match outcome {
            FetchOutcome::Success { .. } => {
                self.health.consecutive_failures = 0;
                self.health.last_successful_fetch = Some(now);
                self.transition(ConnectionStatus::Connected, now)
            }
            FetchOutcome::TransientFailure { .. } => None,
            FetchOutcome::PersistentFailure { .. } => {
                self.health.consecutive_failures = self.health.consecutive_failures.saturating_add(1);
                if self.health.consecutive_failures >= self.threshold {
                    self.transition(ConnectionStatus::Disconnected, now)
                } else {
                    None
                }
            }
        }
    }

    fn transition(&mut self, to: ConnectionStatus, now: DateTime<Utc>) -> Option<StatusChangeEvent> {
        let previous = self.health.status;
        if previous == to {
            return None;
        }

        self.health.status = to;
        self.health.last_change = now;

        Some(StatusChangeEvent {
            status: to,
            previous_status: previous,
            last_change: now,
            consecutive_failures: self.health.consecutive_failures,
        })
    }
}
