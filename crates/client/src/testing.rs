//! Test doubles shared by the client's unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::fetch::PageFetcher;
use crate::resolver::Resolver;
use reelrate_core::{Error, Rating, RatingValue};

pub const INCEPTION_SEARCH: &str = r#"
<html><body>
<table class="findList">
  <tr><td class="result_text"><a href="/title/tt1375666/?ref_=fn_al_tt_1">Inception</a> (2010)</td></tr>
</table>
</body></html>
"#;

pub const INCEPTION_PAGE: &str = r#"
<html><body>
<div class="ratingValue"><strong><span itemprop="ratingValue">8.8</span></strong></div>
<a href="/title/tt1375666/ratings"><span itemprop="ratingCount">2,300,000</span></a>
</body></html>
"#;

pub const NO_RESULTS: &str = r#"<html><body><div class="findNoResults">No results found</div></body></html>"#;

/// Fetcher answering from a fixed URL -> HTML map; unknown URLs are 404s.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn get_html(&self, url: &Url) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("{url} returned status 404")))
    }
}

/// Resolver with scripted answers per title and a call counter.
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    answers: Arc<Mutex<HashMap<String, RatingValue>>>,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rated(self, title: &str, score: &str, votes: &str) -> Self {
        let rating = Rating::new(score, votes, Some(format!("https://www.imdb.com/title/{}/", slug(title))));
        self.answer(title, rating.into())
    }

    pub fn answer(self, title: &str, value: RatingValue) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(title.to_string(), value);
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(&self, title: &str) -> Result<RatingValue, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::FetchTimeout(format!("resolving {title}")));
        }
        let answer = self.answers.lock().ok().and_then(|answers| answers.get(title).cloned());
        Ok(answer.unwrap_or_else(RatingValue::empty))
    }
}
