//! cache_flush tool implementation.
//!
//! Evicts expired ratings and persists the rest.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use reelrate_core::RatingStore;

/// Parameters for the cache_flush tool. There are none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheFlushParams {}

/// Output from the cache_flush tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFlushOutput {
    /// Entries dropped because they had expired.
    pub evicted: usize,
    /// Entries written to the persisted record.
    pub remaining: usize,
}

/// Implementation of the cache_flush tool.
pub async fn flush_impl(store: &RatingStore, _params: CacheFlushParams) -> Result<CallToolResult, McpError> {
    let evicted = store.evict_expired().await;
    let remaining = store.flush().await?;

    tracing::info!(evicted, remaining, "rating cache flushed on request");
    Ok(json_result(&CacheFlushOutput { evicted, remaining }))
}
