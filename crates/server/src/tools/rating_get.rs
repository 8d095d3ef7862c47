//! rating_get tool implementation.
//!
//! Looks a title up through the gateway: cache first, rating site on a miss.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use reelrate_client::RatingGateway;
use reelrate_core::RatingValue;

/// Input parameters for rating_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RatingGetParams {
    /// Title as shown on the streaming page, e.g. "Inception".
    pub title: String,
}

/// Output structure for rating_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RatingGetOutput {
    pub title: String,
    /// `{score, voteCount, detailUrl}` or `{}` when the title has no rating.
    pub rating: RatingValue,
    /// Widget text for the rating, e.g. "8.8/10 (2,300,000 votes)" or "N/A".
    pub display: String,
}

/// Implementation of the rating_get tool.
pub async fn get_impl(gateway: &RatingGateway, params: RatingGetParams) -> Result<CallToolResult, McpError> {
    let title = params.title.trim();
    let rating = gateway.get_rating(title).await?;

    let output = RatingGetOutput { title: title.to_string(), display: rating.display_text(), rating };
    Ok(json_result(&output))
}
