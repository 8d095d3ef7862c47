//! Rating widgets: a loading placeholder that settles exactly once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::classify::Category;
use reelrate_core::{Error, RatingValue};

const ICON_URL: &str = "https://raw.githubusercontent.com/ioannisioannou16/netflix-imdb/master/imdb-icon.png";

/// Visual state of a widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WidgetState {
    Loading,
    /// Resolution failed in transport.
    Error,
    /// Resolved, but no usable rating.
    Unscored,
    Scored {
        score: String,
        votes: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail_url: Option<String>,
    },
}

impl WidgetState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, WidgetState::Loading)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WidgetState::Loading => "loading",
            WidgetState::Error => "error",
            WidgetState::Unscored => "unscored",
            WidgetState::Scored { .. } => "scored",
        }
    }
}

#[derive(Debug)]
struct Widget {
    category: Category,
    title: String,
    state: WidgetState,
    detached: bool,
}

/// Shared handle to one mounted widget.
///
/// The page keeps one clone, the pending resolution another; whichever
/// outlives the other is fine.
#[derive(Debug, Clone)]
pub struct WidgetHandle(Arc<Mutex<Widget>>);

impl WidgetHandle {
    /// New widget in the loading state.
    pub fn new(category: Category, title: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(Widget {
            category,
            title: title.into(),
            state: WidgetState::Loading,
            detached: false,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, Widget> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn category(&self) -> Category {
        self.lock().category
    }

    pub fn title(&self) -> String {
        self.lock().title.clone()
    }

    pub fn state(&self) -> WidgetState {
        self.lock().state.clone()
    }

    pub fn is_settled(&self) -> bool {
        self.lock().state.is_settled()
    }

    pub fn is_detached(&self) -> bool {
        self.lock().detached
    }

    /// The widget's anchor left the page. Later settlements are dropped.
    pub fn detach(&self) {
        self.lock().detached = true;
    }

    /// Apply a resolution outcome.
    ///
    /// Only the first call on an attached widget changes anything; returns
    /// whether this call did.
    pub fn settle(&self, outcome: Result<RatingValue, Error>) -> bool {
        let mut widget = self.lock();
        if widget.detached || widget.state.is_settled() {
            return false;
        }

        widget.state = match outcome {
            Ok(value) => match value.rating() {
                Some(rating) => WidgetState::Scored {
                    score: rating.score.trim().to_string(),
                    votes: rating.vote_count.trim().to_string(),
                    detail_url: rating.detail_url.clone(),
                },
                None => WidgetState::Unscored,
            },
            Err(_) => WidgetState::Error,
        };
        true
    }

    /// Click action: the detail page to open in a new context, if the widget
    /// is scored and knows one.
    pub fn activate(&self) -> Option<String> {
        match &self.lock().state {
            WidgetState::Scored { detail_url, .. } => detail_url.clone(),
            _ => None,
        }
    }

    /// Text as displayed.
    pub fn text(&self) -> String {
        match &self.lock().state {
            WidgetState::Loading => "fetching..".to_string(),
            WidgetState::Error => "ERROR".to_string(),
            WidgetState::Unscored => "N/A".to_string(),
            WidgetState::Scored { score, votes, .. } => format!("{score}/10 ({votes} votes)"),
        }
    }

    /// Fragment markup for the current state.
    pub fn to_html(&self) -> String {
        let body = match &self.lock().state {
            WidgetState::Loading => r#"<span class="imdb-loading">fetching..</span>"#.to_string(),
            WidgetState::Error => r#"<span class="imdb-error">ERROR</span>"#.to_string(),
            WidgetState::Unscored => r#"<span class="imdb-no-rating">N/A</span>"#.to_string(),
            WidgetState::Scored { score, votes, detail_url } => {
                let spans = format!(
                    r#"<span class="imdb-score">{}/10</span><span class="imdb-votes">({} votes)</span>"#,
                    escape(score),
                    escape(votes)
                );
                match detail_url {
                    Some(url) => format!(r#"<a href="{}" target="_blank" rel="noopener">{spans}</a>"#, escape(url)),
                    None => spans,
                }
            }
        };

        format!(r#"<div class="imdb-rating"><img class="imdb-image" src="{ICON_URL}"><div>{body}</div></div>"#)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelrate_core::Rating;

    fn inception() -> RatingValue {
        Rating::new("8.8", "2,300,000", Some("https://www.imdb.com/title/tt1375666/".into())).into()
    }

    #[test]
    fn test_starts_loading() {
        let widget = WidgetHandle::new(Category::Card, "Inception");
        assert_eq!(widget.state(), WidgetState::Loading);
        assert_eq!(widget.text(), "fetching..");
        assert!(widget.to_html().contains(r#"<span class="imdb-loading">fetching..</span>"#));
        assert!(widget.activate().is_none());
    }

    #[test]
    fn test_scored() {
        let widget = WidgetHandle::new(Category::Overview, "Inception");
        assert!(widget.settle(Ok(inception())));

        assert_eq!(widget.text(), "8.8/10 (2,300,000 votes)");
        assert_eq!(widget.activate().as_deref(), Some("https://www.imdb.com/title/tt1375666/"));

        let html = widget.to_html();
        assert!(html.contains(r#"<span class="imdb-score">8.8/10</span>"#));
        assert!(html.contains(r#"<span class="imdb-votes">(2,300,000 votes)</span>"#));
        assert!(html.contains(r#"href="https://www.imdb.com/title/tt1375666/""#));
    }

    #[test]
    fn test_unscored_for_empty_and_incomplete() {
        let empty = WidgetHandle::new(Category::Card, "Obscure Short Film");
        empty.settle(Ok(RatingValue::empty()));
        assert_eq!(empty.state(), WidgetState::Unscored);
        assert!(empty.to_html().contains(r#"<span class="imdb-no-rating">N/A</span>"#));

        let partial = WidgetHandle::new(Category::Card, "Heat");
        partial.settle(Ok(Rating::new("8.3", "", None).into()));
        assert_eq!(partial.text(), "N/A");
    }

    #[test]
    fn test_error() {
        let widget = WidgetHandle::new(Category::Trailer, "Inception");
        widget.settle(Err(Error::FetchTimeout("slow".into())));
        assert_eq!(widget.state(), WidgetState::Error);
        assert!(widget.to_html().contains(r#"<span class="imdb-error">ERROR</span>"#));
    }

    #[test]
    fn test_settles_exactly_once() {
        let widget = WidgetHandle::new(Category::Card, "Inception");
        assert!(widget.settle(Err(Error::HttpError("503".into()))));
        assert!(!widget.settle(Ok(inception())));
        assert_eq!(widget.state(), WidgetState::Error);
    }

    #[test]
    fn test_detached_ignores_settle() {
        let widget = WidgetHandle::new(Category::Card, "Inception");
        widget.detach();
        assert!(!widget.settle(Ok(inception())));
        assert_eq!(widget.state(), WidgetState::Loading);
    }

    #[test]
    fn test_markup_is_escaped() {
        let widget = WidgetHandle::new(Category::Card, "x");
        widget.settle(Ok(Rating::new("<b>9</b>", "1 & 2", None).into()));
        let html = widget.to_html();
        assert!(html.contains("&lt;b&gt;9&lt;/b&gt;/10"));
        assert!(html.contains("(1 &amp; 2 votes)"));
    }

    #[test]
    fn test_state_serializes_tagged() {
        let widget = WidgetHandle::new(Category::Card, "Inception");
        widget.settle(Ok(inception()));
        let json = serde_json::to_value(widget.state()).unwrap();
        assert_eq!(json["state"], "scored");
        assert_eq!(json["score"], "8.8");
    }
}
