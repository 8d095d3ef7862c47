//! SQLite persistence backend.
//!
//! Keeps each storage key as one row of `kv_store`. Writes made through a
//! backend are announced to its own subscribers immediately; writes made by
//! other processes sharing the file are picked up by [`SqliteBackend::watch`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::backend::{ContextId, SnapshotBackend, SnapshotChanged};
use super::connection::StoreDb;
use crate::Error;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Snapshot backend over a [`StoreDb`].
#[derive(Clone)]
pub struct SqliteBackend {
    db: StoreDb,
    key: String,
    changes: broadcast::Sender<SnapshotChanged>,
}

impl SqliteBackend {
    pub fn new(db: StoreDb, key: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { db, key: key.into(), changes }
    }

    /// Poll for commits by other processes and announce them.
    ///
    /// The returned task runs until aborted.
    pub fn watch(&self, interval: Duration) -> JoinHandle<()> {
        let backend = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last = None;

            loop {
                ticker.tick().await;

                let version = match backend.db.data_version().await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read data_version; stopping watch");
                        return;
                    }
                };

                if last.replace(version).is_none_or(|previous| previous == version) {
                    continue;
                }

                match backend.load().await {
                    Ok(Some(payload)) => {
                        tracing::debug!(key = %backend.key, "external snapshot write detected");
                        let _ = backend.changes.send(SnapshotChanged { writer: None, payload: Arc::from(payload) });
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "failed to read externally written snapshot"),
                }
            }
        })
    }
}

#[async_trait]
impl SnapshotBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self) -> Result<Option<String>, Error> {
        let key = self.key.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn save(&self, writer: ContextId, payload: String) -> Result<(), Error> {
        let key = self.key.clone();
        let shared: Arc<str> = Arc::from(payload.as_str());
        let writer_text = writer.to_string();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv_store (key, value, writer, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        writer = excluded.writer,
                        updated_at = excluded.updated_at",
                    params![key, payload, writer_text, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        let _ = self.changes.send(SnapshotChanged { writer: Some(writer), payload: shared });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SnapshotChanged> {
        self.changes.subscribe()
    }
}
