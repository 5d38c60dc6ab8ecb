//! Configuration file watcher for hot reload.
//!
//! Watches the parent directory so saves that rename a temp file over the
//! config still trigger a reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::CacherConfig;
use crate::config::validation::validate_config;

/// Adjustments layered over every loaded configuration (command-line flags).
pub type ConfigOverrides = Arc<dyn Fn(&mut CacherConfig) + Send + Sync>;

/// Loads the config file and re-applies process-level overrides.
#[derive(Clone)]
pub struct ConfigReloader {
    path: PathBuf,
    overrides: ConfigOverrides,
}

impl ConfigReloader {
    pub fn new(path: &Path, overrides: ConfigOverrides) -> Self {
        Self {
            path: path.to_path_buf(),
            overrides,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, apply overrides, validate the result.
    pub fn reload(&self) -> Result<CacherConfig, ConfigError> {
        let mut config = load_config(&self.path)?;
        (self.overrides)(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

/// Pushes reloaded configurations into the scheduler's update channel.
pub struct ConfigWatcher {
    reloader: ConfigReloader,
    update_tx: mpsc::UnboundedSender<CacherConfig>,
}

impl ConfigWatcher {
    pub fn new(reloader: ConfigReloader, update_tx: mpsc::UnboundedSender<CacherConfig>) -> Self {
        Self { reloader, update_tx }
    }

    /// Start watching on notify's background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.reloader.path().to_path_buf();
        let file_name = path.file_name().map(OsString::from).unwrap_or_default();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let reloader = self.reloader;
        let tx = self.update_tx;
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_file(&event, &file_name) => match reloader.reload() {
                    Ok(config) => {
                        tracing::info!(path = %reloader.path().display(), "Config file changed, reloaded");
                        if tx.send(config).is_err() {
                            tracing::debug!("Scheduler gone, dropping reloaded config");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Config reload rejected, keeping current configuration"),
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether a directory event concerns the watched file's contents.
fn touches_file(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|name| name == file_name.as_os_str()))
}
