//! Fixtures for tool tests.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::CallToolResult;

use reelrate_client::{RatingGateway, Resolver};
use reelrate_core::{CacheLifetime, Error, MemoryBackend, Rating, RatingStore, RatingValue};

/// Resolver giving the same answer for every title.
pub struct CannedResolver(Option<RatingValue>);

impl CannedResolver {
    pub fn rated(score: &str, votes: &str) -> Self {
        Self(Some(Rating::new(score, votes, Some("https://www.imdb.com/title/tt1375666/".into())).into()))
    }

    pub fn empty() -> Self {
        Self(Some(RatingValue::empty()))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl Resolver for CannedResolver {
    async fn resolve(&self, title: &str) -> Result<RatingValue, Error> {
        self.0
            .clone()
            .ok_or_else(|| Error::FetchTimeout(format!("resolving {title}")))
    }
}

pub async fn gateway(resolver: CannedResolver) -> RatingGateway {
    let store = RatingStore::open(Arc::new(MemoryBackend::new()), CacheLifetime::default()).await;
    RatingGateway::new(Arc::new(store), Arc::new(resolver))
}

pub fn output_text(result: &CallToolResult) -> String {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content")
        .to_string()
}
