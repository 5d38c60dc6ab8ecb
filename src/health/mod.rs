//! Connection health subsystem.
//!
//! # Data Flow
//! ```text
//! Classified outcome (from the scheduler)
//!     → machine.rs (count persistent failures, decide transitions)
//!     → tracker.rs (atomic swap of the published ConnectionHealth)
//!     → StatusChangeEvent handed to the event broadcaster
//!
//! Readers (/status, new subscribers):
//!     tracker.rs snapshot (never blocks the scheduler)
//! ```
//!
//! # Design Decisions
//! - Threshold of consecutive persistent failures prevents flapping
//! - Transient failures are logged but never counted
//! - Health is in-memory only; every process starts from `unknown`

pub mod machine;
pub mod state;
pub mod tracker;

pub use machine::HealthStateMachine;
pub use state::{ConnectionHealth, ConnectionStatus, StatusChangeEvent, StatusSnapshot};
pub use tracker::HealthTracker;
