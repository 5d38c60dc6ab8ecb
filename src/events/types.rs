//! Event payloads delivered to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::health::state::{StatusChangeEvent, StatusSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacherEvent {
    /// Current status, sent first on every new subscription.
    ConnectionStatus(StatusSnapshot),
    /// A health state transition.
    ConnectionStatusChange(StatusChangeEvent),
    /// Liveness only.
    Heartbeat(Heartbeat),
}

impl CacherEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            CacherEvent::ConnectionStatus(_) => "connection_status",
            CacherEvent::ConnectionStatusChange(_) => "connection_status_change",
            CacherEvent::Heartbeat(_) => "heartbeat",
        }
    }

    /// JSON body of the event.
    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            CacherEvent::ConnectionStatus(snapshot) => serde_json::to_string(snapshot),
            CacherEvent::ConnectionStatusChange(change) => serde_json::to_string(change),
            CacherEvent::Heartbeat(beat) => serde_json::to_string(beat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::ConnectionStatus;

    #[test]
    fn test_change_event_body() {
        let now = Utc::now();
        let event = CacherEvent::ConnectionStatusChange(StatusChangeEvent {
            status: ConnectionStatus::Disconnected,
            previous_status: ConnectionStatus::Connected,
            last_change: now,
            consecutive_failures: 3,
        });

        assert_eq!(event.name(), "connection_status_change");
        let body: serde_json::Value = serde_json::from_str(&event.data().unwrap()).unwrap();
        assert_eq!(body["status"], "disconnected");
        assert_eq!(body["previous_status"], "connected");
        assert_eq!(body["consecutive_failures"], 3);
    }
}
