//! Connection health types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream connection status.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Unknown = 0,
    Connected = 1,
    Disconnected = 2,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Unknown => "unknown",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current health of the upstream connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionHealth {
    pub status: ConnectionStatus,
    pub consecutive_failures: u32,
    pub last_change: DateTime<Utc>,
    pub last_successful_fetch: Option<DateTime<Utc>>,
}

impl ConnectionHealth {
    /// Initial health at process start.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: ConnectionStatus::Unknown,
            consecutive_failures: 0,
            last_change: now,
            last_successful_fetch: None,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            connection_status: self.status,
            last_connection_change: self.last_change,
            consecutive_failures: self.consecutive_failures,
            last_successful_fetch: self.last_successful_fetch,
        }
    }
}

/// Point-in-time view served to pollers and sent to new subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub connection_status: ConnectionStatus,
    pub last_connection_change: DateTime<Utc>,
    pub consecutive_failures: u32,
    pub last_successful_fetch: Option<DateTime<Utc>>,
}

/// Emitted only when the status actually changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub status: ConnectionStatus,
    pub previous_status: ConnectionStatus,
    pub last_change: DateTime<Utc>,
    pub consecutive_failures: u32,
}
