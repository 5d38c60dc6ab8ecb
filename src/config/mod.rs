//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.toml + .env + process environment
//!     → loader.rs (parse, overlay env vars)
//!     → command-line overrides (watcher.rs ConfigReloader)
//!     → validation.rs (semantic checks)
//!     → CacherConfig (validated, immutable)
//!     → held in an ArcSwap for readers, sent by value to the scheduler
//!
//! On file change / POST /config:
//!     watcher.rs or the HTTP handler produces a new CacherConfig
//!     → validation.rs validates
//!     → atomic swap of Arc<CacherConfig>
//!     → scheduler picks it up at the next cycle boundary
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes replace it wholesale
//! - All fields have defaults so an empty file is valid
//! - Command-line flags are re-applied on every reload, never lost to a file edit
//! - The API key never leaves the process (see `PublicConfig`)

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacherConfig, DiagnosticsConfig, EventsConfig, HealthConfig, ListenerConfig,
    ObservabilityConfig, PublicConfig, ScheduleConfig, StorageConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{ConfigOverrides, ConfigReloader, ConfigWatcher};
