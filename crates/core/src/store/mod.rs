//! Persistent, expiring rating cache shared between page contexts.
//!
//! Each open context owns a [`RatingStore`] over a shared [`SnapshotBackend`].
//! The in-memory map is read and written freely, written to the backend only on
//! [`RatingStore::flush`], and reconciled with other contexts through
//! [`RatingStore::merge_remote`]: per title, the entry with the later expiry
//! wins. There is no locking across contexts.

pub mod backend;
pub mod connection;
pub mod entry;
pub mod migrations;
pub mod sqlite;

pub use crate::Error;

pub use backend::{ContextId, MemoryBackend, SnapshotBackend, SnapshotChanged};
pub use connection::StoreDb;
pub use entry::{CacheEntry, CacheLifetime, StoreSnapshot, now_ms};
pub use sqlite::SqliteBackend;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::model::RatingValue;

/// Title-keyed rating cache with randomized expiry.
pub struct RatingStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    backend: Arc<dyn SnapshotBackend>,
    lifetime: CacheLifetime,
    context: ContextId,
}

impl RatingStore {
    /// Open a store, loading whatever the backend holds.
    ///
    /// An unreadable or corrupt record yields an empty store.
    pub async fn open(backend: Arc<dyn SnapshotBackend>, lifetime: CacheLifetime) -> Self {
        let entries = match backend.load().await {
            Ok(Some(payload)) => match StoreSnapshot::from_json(&payload) {
                Ok(snapshot) => snapshot.0,
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "discarding corrupt rating cache");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "failed to read rating cache; starting empty");
                HashMap::new()
            }
        };

        tracing::debug!(backend = backend.name(), entries = entries.len(), "rating cache loaded");

        Self { entries: RwLock::new(entries), backend, lifetime, context: ContextId::random() }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn lifetime(&self) -> CacheLifetime {
        self.lifetime
    }

    /// Cached value for `title`, if its entry is still valid.
    pub async fn get(&self, title: &str) -> Option<RatingValue> {
        self.get_at(title, now_ms()).await
    }

    pub async fn get_at(&self, title: &str, now: i64) -> Option<RatingValue> {
        let entries = self.entries.read().await;
        entries
            .get(title)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.value.clone())
    }

    /// Cached value for `title` regardless of expiry.
    pub async fn get_stale(&self, title: &str) -> Option<RatingValue> {
        self.entries.read().await.get(title).map(|entry| entry.value.clone())
    }

    /// Cache `value` for `title` with a fresh randomized lifetime.
    pub async fn set(&self, title: &str, value: RatingValue) {
        self.set_at(title, value, now_ms()).await;
    }

    pub async fn set_at(&self, title: &str, value: RatingValue, now: i64) {
        let expires_at = now.saturating_add(self.lifetime.sample_ms());
        self.put_entry(title, CacheEntry::new(value, expires_at)).await;
    }

    /// Insert an entry with an explicit expiry.
    pub async fn put_entry(&self, title: &str, entry: CacheEntry) {
        self.entries.write().await.insert(title.to_string(), entry);
    }

    /// Raw entry for `title`, valid or not.
    pub async fn entry(&self, title: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(title).cloned()
    }

    /// Merge another context's snapshot, keeping the later expiry per title.
    ///
    /// Returns the number of entries taken from `remote`.
    pub async fn merge_remote(&self, remote: &StoreSnapshot) -> usize {
        let mut entries = self.entries.write().await;
        let mut adopted = 0;

        for (title, incoming) in &remote.0 {
            let keep_local = entries
                .get(title)
                .is_some_and(|local| local.expires_at >= incoming.expires_at);
            if !keep_local {
                entries.insert(title.clone(), incoming.clone());
                adopted += 1;
            }
        }

        adopted
    }

    /// Drop every entry that is no longer valid. Returns the number removed.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(now_ms()).await
    }

    pub async fn evict_expired_at(&self, now: i64) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        before - entries.len()
    }

    /// Evict expired entries, then write the whole map to the backend.
    ///
    /// Returns the number of entries written. A failed write is reported and
    /// not retried.
    pub async fn flush(&self) -> Result<usize, Error> {
        let evicted = self.evict_expired().await;
        let snapshot = self.snapshot().await;
        let payload = snapshot.to_json()?;

        self.backend.save(self.context, payload).await?;

        tracing::debug!(
            backend = self.backend.name(),
            context = %self.context,
            entries = snapshot.len(),
            evicted,
            "rating cache flushed"
        );

        Ok(snapshot.len())
    }

    /// Re-read the backend and merge it into the in-memory map.
    pub async fn reload(&self) -> Result<usize, Error> {
        match self.backend.load().await? {
            Some(payload) => {
                let snapshot = StoreSnapshot::from_json(&payload)?;
                Ok(self.merge_remote(&snapshot).await)
            }
            None => Ok(0),
        }
    }

    /// Copy of the current map, including entries not yet evicted.
    pub async fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot(self.entries.read().await.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Merge every snapshot other contexts write to the backend.
    ///
    /// The subscription is taken before this returns, so no later write is
    /// missed. The task ends when the backend's channel closes or it is aborted.
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut changes = store.backend.subscribe();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.writer == Some(store.context) {
                            continue;
                        }
                        match StoreSnapshot::from_json(&change.payload) {
                            Ok(remote) => {
                                let adopted = store.merge_remote(&remote).await;
                                tracing::debug!(context = %store.context, adopted, "merged remote rating cache");
                            }
                            Err(e) => tracing::warn!(error = %e, "ignoring unreadable remote rating cache"),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed rating cache notifications; reloading");
                        if let Err(e) = store.reload().await {
                            tracing::warn!(error = %e, "failed to reload rating cache");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
