//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load persisted state → Wire subsystems → Spawn scheduler + heartbeat → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → scheduler, heartbeat, event streams and server exit → Join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: persisted state first, then tasks, then listeners
//! - A scheduler cycle in flight is bounded by the request timeout, so shutdown never hangs on upstream

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{shutdown_on_signal, wait_for_signal};
pub use startup::{Application, StartupError};
