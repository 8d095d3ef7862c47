//! Rating values produced by the resolver and held by the store.

use serde::{Deserialize, Serialize};

/// A resolved rating for one title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Score as printed on the rating site, e.g. `"8.8"`.
    pub score: String,
    /// Vote count as printed on the rating site, e.g. `"2,300,000"`.
    ///
    /// Records written by the userscript name this field `votes`.
    #[serde(alias = "votes")]
    pub vote_count: String,
    /// Detail page of the title, opened when a scored widget is activated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
}

impl Rating {
    pub fn new(score: impl Into<String>, vote_count: impl Into<String>, detail_url: Option<String>) -> Self {
        Self { score: score.into(), vote_count: vote_count.into(), detail_url }
    }

    /// False when score or vote count is blank.
    pub fn is_complete(&self) -> bool {
        !self.score.trim().is_empty() && !self.vote_count.trim().is_empty()
    }
}

/// Resolution finished and the site has no rating for the title.
///
/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EmptyRating {}

/// Outcome of a successful resolution: a rating, or the knowledge that none exists.
///
/// Both variants are cacheable. A failed resolution is an `Error`, never a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum RatingValue {
    Rated(Rating),
    Empty(EmptyRating),
}

impl RatingValue {
    pub fn empty() -> Self {
        RatingValue::Empty(EmptyRating {})
    }

    /// The rating, if it is present and complete enough to display.
    pub fn rating(&self) -> Option<&Rating> {
        match self {
            RatingValue::Rated(rating) if rating.is_complete() => Some(rating),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rating().is_none()
    }

    /// Text shown in a settled widget: `"8.8/10 (2,300,000 votes)"` or `"N/A"`.
    pub fn display_text(&self) -> String {
        match self.rating() {
            Some(rating) => format!("{}/10 ({} votes)", rating.score.trim(), rating.vote_count.trim()),
            None => "N/A".to_string(),
        }
    }
}

impl From<Rating> for RatingValue {
    fn from(rating: Rating) -> Self {
        RatingValue::Rated(rating)
    }
}

impl From<EmptyRating> for RatingValue {
    fn from(empty: EmptyRating) -> Self {
        RatingValue::Empty(empty)
    }
}
