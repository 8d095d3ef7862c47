//! Cache-first rating lookup.
//!
//! A title is looked up in the [`RatingStore`] first; on a miss the resolver
//! runs and its answer, empty or not, is cached. Transport failures never
//! reach the store.

use std::sync::Arc;

use reelrate_core::{Error, RatingStore, RatingValue};

use crate::resolver::Resolver;

/// Single entry point for "rating for this title".
#[derive(Clone)]
pub struct RatingGateway {
    store: Arc<RatingStore>,
    resolver: Arc<dyn Resolver>,
    serve_stale_on_error: bool,
}

impl RatingGateway {
    pub fn new(store: Arc<RatingStore>, resolver: Arc<dyn Resolver>) -> Self {
        Self { store, resolver, serve_stale_on_error: false }
    }

    /// Answer with an expired cached value when resolution fails.
    pub fn serve_stale_on_error(mut self, enabled: bool) -> Self {
        self.serve_stale_on_error = enabled;
        self
    }

    pub fn store(&self) -> &Arc<RatingStore> {
        &self.store
    }

    /// Rating for `title`, from cache when valid, otherwise resolved and cached.
    ///
    /// Concurrent misses for the same title each resolve; the last write wins.
    pub async fn get_rating(&self, title: &str) -> Result<RatingValue, Error> {
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("title cannot be empty".into()));
        }

        if let Some(value) = self.store.get(title).await {
            tracing::debug!(title, "rating cache hit");
            return Ok(value);
        }

        match self.resolver.resolve(title).await {
            Ok(value) => {
                self.store.set(title, value.clone()).await;
                tracing::debug!(title, rated = !value.is_empty(), "rating resolved");
                Ok(value)
            }
            Err(e) => {
                if self.serve_stale_on_error
                    && let Some(stale) = self.store.get_stale(title).await
                {
                    tracing::warn!(title, error = %e, "resolution failed; serving expired rating");
                    return Ok(stale);
                }
                tracing::warn!(title, error = %e, "rating resolution failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedResolver;
    use reelrate_core::{CacheEntry, CacheLifetime, MemoryBackend, Rating};
    use std::time::Duration;

    async fn gateway(resolver: &ScriptedResolver) -> RatingGateway {
        let store = RatingStore::open(Arc::new(MemoryBackend::new()), CacheLifetime::default()).await;
        RatingGateway::new(Arc::new(store), Arc::new(resolver.clone()))
    }

    #[tokio::test]
    async fn test_miss_resolves_and_caches() {
        let resolver = ScriptedResolver::new().rated("Inception", "8.8", "2,300,000");
        let gateway = gateway(&resolver).await;

        let first = gateway.get_rating("Inception").await.unwrap();
        assert_eq!(first.display_text(), "8.8/10 (2,300,000 votes)");

        let second = gateway.get_rating("Inception").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let resolver = ScriptedResolver::new();
        let gateway = gateway(&resolver).await;

        assert!(gateway.get_rating("Obscure Short Film").await.unwrap().is_empty());
        assert!(gateway.get_rating("Obscure Short Film").await.unwrap().is_empty());
        assert_eq!(resolver.calls(), 1);

        let entry = gateway.store().entry("Obscure Short Film").await.unwrap();
        assert!(entry.value.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_does_not_poison_cache() {
        let resolver = ScriptedResolver::new().rated("Inception", "8.8", "2,300,000");
        resolver.set_failing(true);
        let gateway = gateway(&resolver).await;

        let err = gateway.get_rating("Inception").await.unwrap_err();
        assert!(err.is_transport());
        assert!(gateway.store().entry("Inception").await.is_none());

        resolver.set_failing(false);
        let value = gateway.get_rating("Inception").await.unwrap();
        assert!(!value.is_empty());
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_resolves_again() {
        let resolver = ScriptedResolver::new().rated("Heat", "8.3", "700,000");
        let gateway = gateway(&resolver).await;
        gateway.store().put_entry("Heat", CacheEntry::new(RatingValue::empty(), 1)).await;

        let value = gateway.get_rating("Heat").await.unwrap();
        assert_eq!(value.display_text(), "8.3/10 (700,000 votes)");
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_resolve() {
        let resolver =
            ScriptedResolver::new().rated("Inception", "8.8", "2,300,000").with_delay(Duration::from_millis(20));
        let gateway = gateway(&resolver).await;

        let (a, b) = tokio::join!(gateway.get_rating("Inception"), gateway.get_rating("Inception"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(resolver.calls(), 2);
        assert_eq!(gateway.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_stale_served_on_error_when_enabled() {
        let resolver = ScriptedResolver::new();
        resolver.set_failing(true);
        let gateway = gateway(&resolver).await.serve_stale_on_error(true);

        let stale: RatingValue = Rating::new("7.0", "10", None).into();
        gateway.store().put_entry("Heat", CacheEntry::new(stale.clone(), 1)).await;

        assert_eq!(gateway.get_rating("Heat").await.unwrap(), stale);
    }

    #[tokio::test]
    async fn test_stale_not_served_by_default() {
        let resolver = ScriptedResolver::new();
        resolver.set_failing(true);
        let gateway = gateway(&resolver).await;
        gateway.store().put_entry("Heat", CacheEntry::new(RatingValue::empty(), 1)).await;

        assert!(gateway.get_rating("Heat").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let resolver = ScriptedResolver::new();
        let gateway = gateway(&resolver).await;

        assert!(matches!(gateway.get_rating("  ").await, Err(Error::InvalidInput(_))));
        assert_eq!(resolver.calls(), 0);
    }
}
