//! Title to rating resolution against the rating site.
//!
//! Two documents per title: the search results page, whose first result
//! names the title page, and the title page itself, which carries the score
//! and vote count. Only transport failures are errors; a title the site does
//! not know, or one without a rating, resolves to the empty rating.

mod parse;

use async_trait::async_trait;
use url::Url;

use crate::fetch::{FetchClient, FetchConfig, PageFetcher, canonicalize, resolve_link, search_url};
use reelrate_core::{AppConfig, Error, RatingValue};

pub(crate) use parse::parse_selector;
pub use parse::{ScrapeSelectors, first_result_link, parse_title_page};

/// Resolves a display title to a rating.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, title: &str) -> Result<RatingValue, Error>;
}

/// Scraping resolver over any [`PageFetcher`].
pub struct ImdbResolver<F = FetchClient> {
    fetcher: F,
    site: Url,
    selectors: ScrapeSelectors,
}

impl ImdbResolver<FetchClient> {
    /// HTTP-backed resolver for the configured site.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let fetcher = FetchClient::new(FetchConfig::from(config))?;
        Self::new(fetcher, &config.site_url)
    }
}

impl<F: PageFetcher> ImdbResolver<F> {
    pub fn new(fetcher: F, site_url: &str) -> Result<Self, Error> {
        let site = canonicalize(site_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { fetcher, site, selectors: ScrapeSelectors::default() })
    }

    pub fn with_selectors(mut self, selectors: ScrapeSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn site(&self) -> &Url {
        &self.site
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Locate the title page for `title`, if the search yields one.
    async fn find_title_page(&self, title: &str) -> Result<Option<Url>, Error> {
        let search = search_url(&self.site, title);
        let body = self.fetcher.get_html(&search).await?;

        let Some(href) = first_result_link(&body, &self.selectors) else {
            tracing::debug!(title, "no search results");
            return Ok(None);
        };

        let detail = resolve_link(&self.site, &href);
        if detail.is_none() {
            tracing::debug!(title, href = %href, "search result link does not resolve on site");
        }
        Ok(detail)
    }
}

#[async_trait]
impl<F: PageFetcher> Resolver for ImdbResolver<F> {
    async fn resolve(&self, title: &str) -> Result<RatingValue, Error> {
        let Some(detail_url) = self.find_title_page(title).await? else {
            return Ok(RatingValue::empty());
        };

        let body = self.fetcher.get_html(&detail_url).await?;
        let value = parse_title_page(&body, &self.selectors, &detail_url);

        if value.is_empty() {
            tracing::debug!(title, url = %detail_url, "title page has no complete rating");
        }
        Ok(value)
    }
}
