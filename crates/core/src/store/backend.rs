//! Persistence backends for the rating store.
//!
//! A backend holds one serialized snapshot under a storage key and announces
//! every write on a broadcast channel, so all stores sharing the backend can
//! merge the new state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::Error;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Identity of one store instance (one open page context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Notification that the persisted snapshot was rewritten.
#[derive(Debug, Clone)]
pub struct SnapshotChanged {
    /// Writer of the new value; `None` when the write came from outside this process.
    pub writer: Option<ContextId>,
    /// The newly written snapshot, serialized.
    pub payload: Arc<str>,
}

/// Key/value persistence for the serialized store.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// A name for tracing.
    fn name(&self) -> &'static str;

    /// Read the persisted snapshot; `None` on first use.
    async fn load(&self) -> Result<Option<String>, Error>;

    /// Replace the persisted snapshot and notify subscribers.
    async fn save(&self, writer: ContextId, payload: String) -> Result<(), Error>;

    /// Subscribe to snapshot change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SnapshotChanged>;
}

/// In-process backend shared by every store holding a clone.
#[derive(Clone)]
pub struct MemoryBackend {
    record: Arc<RwLock<Option<String>>>,
    changes: broadcast::Sender<SnapshotChanged>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { record: Arc::new(RwLock::new(None)), changes }
    }

    /// Backend pre-seeded with a raw record, e.g. a corrupt one.
    pub fn with_record(payload: impl Into<String>) -> Self {
        let backend = Self::new();
        Self { record: Arc::new(RwLock::new(Some(payload.into()))), ..backend }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<String>, Error> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, writer: ContextId, payload: String) -> Result<(), Error> {
        let shared: Arc<str> = Arc::from(payload.as_str());
        *self.record.write().await = Some(payload);
        // No subscribers is fine.
        let _ = self.changes.send(SnapshotChanged { writer: Some(writer), payload: shared });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SnapshotChanged> {
        self.changes.subscribe()
    }
}
