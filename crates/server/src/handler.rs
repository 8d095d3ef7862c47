//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use crate::tools::cache::{CacheFlushParams, flush_impl};
use crate::tools::page_annotate::{PageAnnotateParams, annotate_impl};
use crate::tools::rating_get::{RatingGetParams, get_impl};
use reelrate_client::{Classifier, RatingGateway};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// Everything the tools share.
pub struct ServerState {
    pub gateway: RatingGateway,
    pub classifier: Classifier,
    pub observation_root: String,
}

/// The main MCP server handler for reelrate.
#[derive(Clone)]
pub struct ReelrateServer {
    state: Arc<ServerState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ReelrateServer {
    /// Create a new server handler.
    pub fn new(state: ServerState) -> Self {
        Self { state: Arc::new(state), tool_router: Self::tool_router() }
    }

    /// Rating for one title, served from the cache when it is still valid.
    #[tool(description = "Get the IMDb rating for a title. Returns score, vote count, detail URL and display text; \
                          an empty rating means the title has none.")]
    async fn rating_get(&self, params: Parameters<RatingGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state.gateway, params.0).await
    }

    /// Annotate a host page with rating widgets.
    #[tool(description = "Annotate Netflix page HTML with IMDb rating widgets. Returns each widget's category, \
                          title, state and markup, plus the annotated page.")]
    async fn page_annotate(&self, params: Parameters<PageAnnotateParams>) -> Result<CallToolResult, McpError> {
        annotate_impl(&self.state.gateway, &self.state.classifier, &self.state.observation_root, params.0).await
    }

    /// Evict expired ratings and persist the cache.
    #[tool(description = "Evict expired ratings and write the rating cache to disk.")]
    async fn cache_flush(&self, params: Parameters<CacheFlushParams>) -> Result<CallToolResult, McpError> {
        flush_impl(self.state.gateway.store(), params.0).await
    }
}

impl ServerHandler for ReelrateServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "reelrate".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some("IMDb ratings for streaming catalogue titles, cached across sessions.".into()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
