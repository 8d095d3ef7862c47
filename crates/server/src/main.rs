//! reelrate server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use reelrate_client::{Classifier, ImdbResolver, RatingGateway, Skin};
use reelrate_core::{AppConfig, RatingStore, SqliteBackend, StoreDb};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let classifier = Classifier::new(Skin::compile(&config.skin)?);
    tracing::info!(db = %config.db_path.display(), site = %config.site_url, "Starting reelrate server on stdio transport");

    let db = StoreDb::open(&config.db_path).await?;
    let backend = SqliteBackend::new(db, config.storage_key.clone());
    let watcher = backend.watch(config.sync_poll_interval());

    let store = Arc::new(RatingStore::open(Arc::new(backend), config.lifetime()).await);
    let sync = store.spawn_sync();

    let resolver = ImdbResolver::from_config(&config)?;
    let gateway =
        RatingGateway::new(Arc::clone(&store), Arc::new(resolver)).serve_stale_on_error(config.serve_stale_on_error);

    let handler = handler::ReelrateServer::new(handler::ServerState {
        gateway,
        classifier,
        observation_root: config.observation_root.clone(),
    });
    let server = serve_server(handler, stdio()).await?;
    let outcome = server.waiting().await;

    sync.abort();
    watcher.abort();
    match store.flush().await {
        Ok(entries) => tracing::info!(entries, "rating cache persisted on shutdown"),
        Err(e) => tracing::warn!(error = %e, "failed to persist rating cache on shutdown"),
    }

    outcome?;
    Ok(())
}
