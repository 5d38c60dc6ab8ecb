//! Rate-limited upstream fetch-and-cache service.
//!
//! A single scheduler task polls one upstream JSON endpoint, gated by a
//! persisted minimum-interval rate limiter, classifies every outcome, keeps a
//! live and a backup copy of the last good payload, tracks connection health
//! and broadcasts health transitions to live subscribers.

pub mod cache;
pub mod config;
pub mod events;
pub mod fetcher;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::schema::CacherConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
