//! Local query API subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (request ID, trace, CORS, timeout layers)
//!     → handlers.rs (/data, /backup, /status, /config): lock-free snapshot reads
//!     → sse.rs (/events): broadcaster subscription streamed as SSE
//!
//! POST /config
//!     → validate → swap shared config → mpsc → scheduler applies at next cycle
//! ```
//!
//! # Design Decisions
//! - Handlers never write cache or health state; the scheduler is the only writer
//! - The upstream endpoint cannot be changed over HTTP
//! - Event streams end on shutdown so graceful shutdown can drain

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{AppState, HttpServer, X_REQUEST_ID};
