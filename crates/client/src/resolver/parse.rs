//! Scraping of search result and title detail documents.
//!
//! The selectors are the rating site's presentation, not an API. They change
//! when the site changes, so they live in one place: [`ScrapeSelectors`].

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use reelrate_core::{Error, Rating, RatingValue};

const SEARCH_RESULT: &str = ".result_text > a, a.ipc-metadata-list-summary-item__t";
const SCORE: &str =
    "span[itemprop='ratingValue'], [data-testid='hero-rating-bar__aggregate-rating__score'] > span:first-child";
const VOTES: &str = "span[itemprop='ratingCount']";
const LINKED_DATA: &str = "script[type='application/ld+json']";

/// Selectors locating the nodes the resolver reads.
#[derive(Debug, Clone)]
pub struct ScrapeSelectors {
    /// First match in a search results document is the title link.
    pub search_result: Selector,
    /// Rating value on a title page.
    pub score: Selector,
    /// Vote count on a title page.
    pub votes: Selector,
    /// Embedded structured data, read when the structural nodes are missing.
    pub linked_data: Selector,
}

impl ScrapeSelectors {
    pub fn new(search_result: &str, score: &str, votes: &str) -> Result<Self, Error> {
        Ok(Self {
            search_result: parse_selector(search_result)?,
            score: parse_selector(score)?,
            votes: parse_selector(votes)?,
            linked_data: parse_selector(LINKED_DATA)?,
        })
    }
}

impl Default for ScrapeSelectors {
    fn default() -> Self {
        Self {
            search_result: Selector::parse(SEARCH_RESULT).expect("invalid selector"),
            score: Selector::parse(SCORE).expect("invalid selector"),
            votes: Selector::parse(VOTES).expect("invalid selector"),
            linked_data: Selector::parse(LINKED_DATA).expect("invalid selector"),
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, Error> {
    Selector::parse(selector).map_err(|e| Error::InvalidSelector(format!("{selector}: {e}")))
}

/// `href` of the first search result, if the results list has one.
pub fn first_result_link(html: &str, selectors: &ScrapeSelectors) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&selectors.search_result)
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(str::to_string)
}

/// Read score and vote count from a title page.
///
/// Any missing or blank value yields the empty rating.
pub fn parse_title_page(html: &str, selectors: &ScrapeSelectors, detail_url: &Url) -> RatingValue {
    let document = Html::parse_document(html);

    let score = first_text(&document, &selectors.score);
    let votes = first_text(&document, &selectors.votes);

    let (score, votes) = match (score, votes) {
        (Some(score), Some(votes)) => (score, votes),
        _ => match aggregate_rating(&document, &selectors.linked_data) {
            Some(found) => found,
            None => return RatingValue::empty(),
        },
    };

    Rating::new(score, votes, Some(detail_url.to_string())).into()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(element_text).filter(|text| !text.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkedData {
    aggregate_rating: Option<AggregateRating>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRating {
    rating_value: Option<serde_json::Value>,
    rating_count: Option<serde_json::Value>,
}

fn aggregate_rating(document: &Html, selector: &Selector) -> Option<(String, String)> {
    document.select(selector).find_map(|script| {
        let data: LinkedData = serde_json::from_str(&element_text(script)).ok()?;
        let rating = data.aggregate_rating?;
        let score = json_scalar(rating.rating_value?)?;
        let votes = match rating.rating_count? {
            serde_json::Value::Number(n) => group_thousands(n.as_u64()?),
            other => json_scalar(other)?,
        };
        Some((score, votes))
    })
}

fn json_scalar(value: serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// `2300000` -> `"2,300,000"`, the way the site prints vote counts.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
