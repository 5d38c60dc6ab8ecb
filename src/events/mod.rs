//! Event broadcast subsystem.
//!
//! # Data Flow
//! ```text
//! Scheduler (status transitions) ─┐
//!                                 ├→ broadcaster.rs publish → broadcast ring
//! Heartbeat task (fixed period) ──┘                              │
//!                                                                ▼
//!                                   Subscription (snapshot first, then live events)
//!                                                                │
//!                                                                ▼
//!                                                   /events SSE connection
//! ```
//!
//! # Design Decisions
//! - Best-effort live delivery; `/status` is the durable fallback
//! - Per-subscriber bounded buffers, lagging subscribers skip ahead
//! - Unsubscribe is drop

pub mod broadcaster;
pub mod types;

pub use broadcaster::{EventBroadcaster, Subscription};
pub use types::{CacherEvent, Heartbeat};
