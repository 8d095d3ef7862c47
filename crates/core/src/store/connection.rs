//! SQLite file shared by every page context on the machine.
//!
//! WAL lets one context read the snapshot while another replaces it; the busy
//! timeout covers two contexts flushing at the same moment.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

// busy_timeout first: switching to WAL needs a lock another context may hold.
const PRAGMAS: &str = "PRAGMA busy_timeout=5000;
     PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;";

/// Handle to the snapshot database. Cloning shares the connection thread.
#[derive(Clone, Debug)]
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl StoreDb {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Private database that no other context can see.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// SQLite's data version counter.
    ///
    /// Changes whenever another connection commits to the database file;
    /// commits made through this connection leave it untouched.
    pub async fn data_version(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| conn.query_row("PRAGMA data_version", [], |row| row.get::<_, i64>(0)))
            .await
            .map_err(Error::from)
    }
}
