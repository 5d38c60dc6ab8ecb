//! Upstream fetch subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler.rs (timer, one cycle at a time)
//!     → rate_limiter.rs gate (persisted last call time)
//!     → rate_limiter.rs record_attempt (persist before the call)
//!     → upstream.rs fetch (auth.rs header, request timeout, sample.rs in test mode)
//!     → classifier.rs classify (Success / TransientFailure / PersistentFailure)
//!     → cache::CacheStore put on success (filter.rs logs a diagnostic extract)
//!     → health::HealthStateMachine apply → events publish on transition
//! ```
//!
//! # Design Decisions
//! - Exactly one writer of limiter, health and cache state: the scheduler task
//! - Every attempt consumes the rate limit budget, whatever the outcome
//! - Unrecognized outcomes classify as persistent (fail closed)
//! - Config updates land between cycles, never during one

pub mod auth;
pub mod classifier;
pub mod filter;
pub mod rate_limiter;
pub mod sample;
pub mod scheduler;
pub mod stats;
pub mod upstream;

pub use auth::HeaderStyle;
pub use classifier::{classify, FetchErrorKind, FetchOutcome, RawOutcome};
pub use filter::{FilterError, ResponseFilter};
pub use rate_limiter::{RateLimiter, RateLimiterState, RateLimiterView, RatePolicy};
pub use scheduler::{CycleReport, FetchScheduler, SchedulerHandles};
pub use stats::{FetchStats, FetchStatsSnapshot};
pub use upstream::{UpstreamClient, UpstreamError};
