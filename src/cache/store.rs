//! Live and backup payload caches.
//!
//! Both copies are replaced together on every successful fetch and never
//! touched on failures. Each copy is a durable JSON record plus an in-memory
//! `ArcSwapOption` mirror that serving code reads without locking.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::{read_json, write_json_atomic, StorageError};

/// One cached payload with fetch metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Whether the payload differed from the previous live payload.
    #[serde(default)]
    pub changed: bool,
    /// Set when the live copy was rebuilt from the backup at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from_backup: Option<DateTime<Utc>>,
}

/// Where a payload came from.
#[derive(Debug, Clone, Default)]
pub struct FetchMeta {
    pub source: Option<String>,
    pub status_code: Option<u16>,
}

/// Presence, size and age of one cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyInfo {
    pub fetched_at: DateTime<Utc>,
    pub age_seconds: i64,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub live: Option<CopyInfo>,
    pub backup: Option<CopyInfo>,
}

#[derive(Debug)]
pub struct CacheStore {
    live: ArcSwapOption<CacheEntry>,
    backup: ArcSwapOption<CacheEntry>,
    live_path: PathBuf,
    backup_path: PathBuf,
}

impl CacheStore {
    /// An empty store; nothing is read from disk.
    pub fn new(live_path: impl Into<PathBuf>, backup_path: impl Into<PathBuf>) -> Self {
        Self {
            live: ArcSwapOption::empty(),
            backup: ArcSwapOption::empty(),
            live_path: live_path.into(),
            backup_path: backup_path.into(),
        }
    }

    /// Load both copies from disk. Corrupt copies are dropped with a warning.
    ///
    /// A missing live copy is rebuilt from the backup when one exists.
    pub fn load(live_path: impl Into<PathBuf>, backup_path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        let store = Self::new(live_path, backup_path);

        let live = load_copy(&store.live_path, "live");
        let backup = load_copy(&store.backup_path, "backup");

        let live = match (live, &backup) {
            (Some(live), _) => Some(live),
            (None, Some(backup)) => {
                let restored = CacheEntry {
                    restored_from_backup: Some(now),
                    ..backup.clone()
                };
                match write_json_atomic(&store.live_path, &restored) {
                    Ok(()) => tracing::info!(fetched_at = %restored.fetched_at, "Restored live cache from backup"),
                    Err(e) => tracing::warn!(error = %e, "Restored live cache from backup in memory only"),
                }
                Some(restored)
            }
            (None, None) => None,
        };

        store.live.store(live.map(Arc::new));
        store.backup.store(backup.map(Arc::new));
        store
    }

    /// Replace both copies with `payload`.
    ///
    /// Memory is always updated; the first disk error, if any, is returned.
    pub fn put(&self, payload: Value, meta: FetchMeta, now: DateTime<Utc>) -> Result<Arc<CacheEntry>, StorageError> {
        let changed = self
            .live
            .load()
            .as_ref()
            .map_or(true, |previous| previous.payload != payload);

        let entry = Arc::new(CacheEntry {
            payload,
            fetched_at: now,
            source: meta.source,
            status_code: meta.status_code,
            changed,
            restored_from_backup: None,
        });

        let live_result = write_json_atomic(&self.live_path, entry.as_ref());
        let backup_result = write_json_atomic(&self.backup_path, entry.as_ref());

        self.live.store(Some(entry.clone()));
        self.backup.store(Some(entry.clone()));

        live_result.and(backup_result).map(|()| entry)
    }

    pub fn get_live(&self) -> Option<Arc<CacheEntry>> {
        self.live.load_full()
    }

    pub fn get_backup(&self) -> Option<Arc<CacheEntry>> {
        self.backup.load_full()
    }

    pub fn info(&self, now: DateTime<Utc>) -> CacheInfo {
        CacheInfo {
            live: copy_info(self.get_live().as_deref(), &self.live_path, now),
            backup: copy_info(self.get_backup().as_deref(), &self.backup_path, now),
        }
    }
}

fn load_copy(path: &Path, name: &str) -> Option<CacheEntry> {
    match read_json::<CacheEntry>(path) {
        Ok(Some(entry)) => {
            tracing::info!(copy = name, fetched_at = %entry.fetched_at, "Loaded cached payload");
            Some(entry)
        }
        Ok(None) => {
            tracing::debug!(copy = name, path = %path.display(), "No cached payload on disk");
            None
        }
        Err(e) => {
            tracing::warn!(copy = name, error = %e, "Cached payload unreadable, ignoring");
            None
        }
    }
}

fn copy_info(entry: Option<&CacheEntry>, path: &Path, now: DateTime<Utc>) -> Option<CopyInfo> {
    entry.map(|entry| CopyInfo {
        fetched_at: entry.fetched_at,
        age_seconds: (now - entry.fetched_at).num_seconds().max(0),
        size_bytes: fs::metadata(path).ok().map(|m| m.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("cached_data.json"), dir.path().join("backup.json"))
    }

    #[test]
    fn test_empty_store_reads_absent() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::load(dir.path().join("a.json"), dir.path().join("b.json"), Utc::now());
        assert!(store.get_live().is_none());
        assert!(store.get_backup().is_none());
        assert_eq!(store.info(Utc::now()), CacheInfo { live: None, backup: None });
    }

    #[test]
    fn test_put_updates_both_copies() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let now = Utc::now();

        let entry = store
            .put(json!({"v": 1}), FetchMeta { source: Some("https://x".into()), status_code: Some(200) }, now)
            .unwrap();

        assert!(entry.changed);
        assert_eq!(store.get_live().unwrap().payload, json!({"v": 1}));
        assert_eq!(store.get_backup().unwrap().payload, json!({"v": 1}));
        assert_eq!(store.get_live().unwrap().fetched_at, now);

        let info = store.info(now);
        assert!(info.live.unwrap().size_bytes.unwrap() > 0);
    }

    #[test]
    fn test_unchanged_payload_is_flagged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.put(json!({"v": 1}), FetchMeta::default(), Utc::now()).unwrap();
        let second = store.put(json!({"v": 1}), FetchMeta::default(), Utc::now()).unwrap();
        assert!(!second.changed);
        let third = store.put(json!({"v": 2}), FetchMeta::default(), Utc::now()).unwrap();
        assert!(third.changed);
    }

    #[test]
    fn test_reload_from_disk() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        store_in(&dir).put(json!([1, 2, 3]), FetchMeta::default(), now).unwrap();

        let reloaded = CacheStore::load(dir.path().join("cached_data.json"), dir.path().join("backup.json"), now);
        assert_eq!(reloaded.get_live().unwrap().payload, json!([1, 2, 3]));
        assert_eq!(reloaded.get_backup().unwrap().fetched_at, now);
    }

    #[test]
    fn test_corrupt_live_is_restored_from_backup() {
        let dir = TempDir::new().unwrap();
        let live_path = dir.path().join("cached_data.json");
        let now = Utc::now();
        store_in(&dir).put(json!({"good": true}), FetchMeta::default(), now).unwrap();
        fs::write(&live_path, "{ truncated").unwrap();

        let later = now + chrono::Duration::seconds(30);
        let reloaded = CacheStore::load(&live_path, dir.path().join("backup.json"), later);
        let live = reloaded.get_live().unwrap();
        assert_eq!(live.payload, json!({"good": true}));
        assert_eq!(live.restored_from_backup, Some(later));

        let on_disk: CacheEntry = read_json(&live_path).unwrap().unwrap();
        assert_eq!(on_disk.payload, json!({"good": true}));
    }
}
