//! Local session persistence
//!
//! A durable key-value cache used to resume validation sessions and to
//! keep derived reports across reloads. Snapshot values are
//! `serde_json::Value` with a UTC save timestamp; typed access goes
//! through [`load_fresh`](SessionPersistenceExt::load_fresh).
//!
//! Read-failure policy: an unreadable or corrupt entry loads as `None`
//! with a warning. Resume must never be blocked by a bad cache file.

use crate::error::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

/// Freshness window for cached derived reports
pub const REPORT_FRESHNESS: Duration = Duration::hours(24);

/// One persisted snapshot with its save timestamp
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersistedEntry {
    pub value: serde_json::Value,
    pub saved_at: DateTime<Utc>,
}

impl PersistedEntry {
    /// Whether the entry was saved within `window` of now
    #[must_use]
    pub fn is_fresh(&self, window: Duration) -> bool {
        Utc::now() - self.saved_at <= window
    }
}

/// Durable key-value snapshot store
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Persist a snapshot under `key`, replacing any previous entry
    async fn save(&self, key: &str, entry: PersistedEntry);

    /// Load the snapshot under `key`, or `None` if absent or unreadable
    async fn load(&self, key: &str) -> Option<PersistedEntry>;

    /// Remove the entry under `key`, if any
    async fn clear(&self, key: &str);
}

/// Typed helpers over the raw snapshot store
#[async_trait]
pub trait SessionPersistenceExt: SessionPersistence {
    /// Save a serializable value stamped with the current time
    async fn save_now<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(key, %err, "failed to serialize snapshot, skipping save");
                return;
            }
        };
        self.save(
            key,
            PersistedEntry {
                value,
                saved_at: Utc::now(),
            },
        )
        .await;
    }

    /// Load and decode, applying an optional freshness window
    ///
    /// Stale, absent, and undecodable entries all load as `None`.
    async fn load_fresh<T: DeserializeOwned + Send>(
        &self,
        key: &str,
        window: Option<Duration>,
    ) -> Option<T> {
        let entry = self.load(key).await?;
        if let Some(window) = window {
            if !entry.is_fresh(window) {
                tracing::debug!(key, "cached entry is stale, ignoring");
                return None;
            }
        }
        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, %err, "cached entry does not decode, treating as absent");
                None
            }
        }
    }
}

impl<P: SessionPersistence + ?Sized> SessionPersistenceExt for P {}

/// File-backed persistence: one JSON file per key under a root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root` (created lazily on first save)
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are caller-controlled context ids; escape path separators
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }

    async fn read_entry(&self, key: &str) -> Result<PersistedEntry, PersistenceError> {
        let bytes = tokio::fs::read(self.path_for(key)).await?;
        serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }
}

#[async_trait]
impl SessionPersistence for FileStore {
    async fn save(&self, key: &str, entry: PersistedEntry) {
        let path = self.path_for(key);
        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let bytes = serde_json::to_vec(&entry)
                .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
            tokio::fs::write(&path, bytes).await?;
            Ok::<_, PersistenceError>(())
        };
        if let Err(err) = write.await {
            tracing::warn!(key, %err, "failed to persist snapshot");
        }
    }

    async fn load(&self, key: &str) -> Option<PersistedEntry> {
        match self.read_entry(key).await {
            Ok(entry) => Some(entry),
            Err(PersistenceError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(key, %err, "unreadable cached entry, treating as absent");
                None
            }
        }
    }

    async fn clear(&self, key: &str) {
        if let Err(err) = tokio::fs::remove_file(self.path_for(key)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(key, %err, "failed to clear cached entry");
            }
        }
    }
}
