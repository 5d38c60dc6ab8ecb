//! Payload cache subsystem.
//!
//! # Data Flow
//! ```text
//! Success outcome (scheduler)
//!     → store.rs put: write live + backup records atomically
//!     → swap both in-memory mirrors
//!
//! /data, /backup, /status
//!     → store.rs get_live / get_backup / info (lock-free loads)
//! ```

pub mod store;

pub use store::{CacheEntry, CacheInfo, CacheStore, CopyInfo, FetchMeta};
