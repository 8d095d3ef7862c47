//! MCP tool implementations.

pub mod cache;
pub mod page_annotate;
pub mod rating_get;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// Tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> CallToolResult {
    CallToolResult::success(vec![Content::text(serde_json::to_string_pretty(output).unwrap_or_default())])
}
