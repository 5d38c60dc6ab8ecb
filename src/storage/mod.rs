//! Durable state subsystem.
//!
//! # Data Flow
//! ```text
//! Writer (scheduler task only):
//!     value → serde_json → .<name>.<pid>.<rand>.tmp → fsync → rename over <name>
//!
//! Startup:
//!     <name> → read_json → Some(value) | None (missing) | StorageError (corrupt)
//! ```
//!
//! # Design Decisions
//! - One JSON document per record; no partial updates
//! - Corruption is reported, never repaired here; callers fall back to defaults

pub mod atomic;

pub use atomic::{read_json, write_json_atomic, StorageError};
