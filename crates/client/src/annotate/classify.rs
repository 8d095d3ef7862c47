//! Classification of inserted page subtrees.
//!
//! Rules are tried in a fixed order and the first whose trigger is present
//! in the subtree decides the outcome, even when its extraction then finds
//! nothing usable. Extraction failures are silent.

use ego_tree::NodeId;
use serde::Serialize;

use super::page::{PageTree, Placement};
use super::skin::Skin;

/// Kind of page element a widget or pre-warm is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Hover preview card.
    Card,
    /// Billboard row with a title logo.
    Trailer,
    /// Overview pane of the detail view.
    Overview,
    /// Tile in the detail view's related titles pane.
    RelatedItem,
    /// Title entry in a list row; resolved ahead of time, never rendered.
    IndexEntry,
}

impl Category {
    pub fn is_prewarm(self) -> bool {
        matches!(self, Category::IndexEntry)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Card => "card",
            Category::Trailer => "trailer",
            Category::Overview => "overview",
            Category::RelatedItem => "related_item",
            Category::IndexEntry => "index_entry",
        }
    }
}

/// One requested action: render (or pre-warm) `title` at `anchor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub category: Category,
    pub title: String,
    pub anchor: NodeId,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Card,
    Trailer,
    Detail,
    IndexEntry,
}

impl Rule {
    const ORDER: [Rule; 4] = [Rule::Card, Rule::Trailer, Rule::Detail, Rule::IndexEntry];

    fn trigger<P: PageTree>(self, skin: &Skin, page: &P, root: NodeId) -> Option<NodeId> {
        let selector = match self {
            Rule::Card => &skin.card,
            Rule::Trailer => &skin.trailer_row,
            Rule::Detail => &skin.meta,
            Rule::IndexEntry => &skin.index_entry,
        };
        page.find(root, selector)
    }

    fn extract<P: PageTree>(self, skin: &Skin, page: &P, root: NodeId, trigger: NodeId) -> Vec<CategoryMatch> {
        match self {
            Rule::Card => card(skin, page, trigger).into_iter().collect(),
            Rule::Trailer => trailer(skin, page, trigger).into_iter().collect(),
            Rule::Detail => detail(skin, page, trigger),
            Rule::IndexEntry => page
                .find_all(root, &skin.index_entry)
                .into_iter()
                .filter_map(|entry| {
                    let title = page.find(entry, &skin.index_title).and_then(|t| page.text(t))?;
                    Some(CategoryMatch { category: Category::IndexEntry, title, anchor: entry, placement: Placement::Append })
                })
                .collect(),
        }
    }
}

fn card<P: PageTree>(skin: &Skin, page: &P, card: NodeId) -> Option<CategoryMatch> {
    let title = page.find(card, &skin.card_title).and_then(|t| page.text(t))?;
    Some(CategoryMatch { category: Category::Card, title, anchor: card, placement: Placement::Append })
}

fn trailer<P: PageTree>(skin: &Skin, page: &P, row: NodeId) -> Option<CategoryMatch> {
    let logo = page.find(row, &skin.trailer_logo)?;
    let title = page.attr(logo, "alt").or_else(|| page.attr(logo, "aria-label"))?;
    Some(CategoryMatch { category: Category::Trailer, title, anchor: logo, placement: Placement::InsertAfter })
}

fn detail<P: PageTree>(skin: &Skin, page: &P, meta: NodeId) -> Vec<CategoryMatch> {
    if let Some(pane) = page.closest(meta, &skin.overview_pane) {
        let scope = page.closest(pane, &skin.detail_pane).unwrap_or(pane);
        let title = page
            .find(scope, &skin.detail_fallback_text)
            .and_then(|t| page.text(t))
            .or_else(|| page.find(scope, &skin.detail_logo).and_then(|logo| page.attr(logo, "alt")));
        let anchor = page.find(pane, &skin.meta);

        return match (title, anchor) {
            (Some(title), Some(anchor)) => {
                vec![CategoryMatch { category: Category::Overview, title, anchor, placement: Placement::InsertAfter }]
            }
            _ => Vec::new(),
        };
    }

    if let Some(pane) = page.closest(meta, &skin.related_pane) {
        return page
            .find_all(pane, &skin.related_tile)
            .into_iter()
            .filter_map(|tile| {
                let title = page.find(tile, &skin.related_artwork).and_then(|art| page.attr(art, "alt"))?;
                let anchor = page.find(tile, &skin.meta)?;
                Some(CategoryMatch { category: Category::RelatedItem, title, anchor, placement: Placement::InsertAfter })
            })
            .collect();
    }

    Vec::new()
}

/// Ordered rule set over a [`Skin`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    skin: Skin,
}

impl Classifier {
    pub fn new(skin: Skin) -> Self {
        Self { skin }
    }

    pub fn skin(&self) -> &Skin {
        &self.skin
    }

    /// Actions requested by the subtree inserted at `root`.
    pub fn classify<P: PageTree>(&self, page: &P, root: NodeId) -> Vec<CategoryMatch> {
        for rule in Rule::ORDER {
            if let Some(trigger) = rule.trigger(&self.skin, page, root) {
                return rule.extract(&self.skin, page, root, trigger);
            }
        }
        Vec::new()
    }

    /// Detail view actions for whatever is already on the page, one
    /// extraction per pane however many metadata blocks it holds.
    pub fn scan_existing<P: PageTree>(&self, page: &P) -> Vec<CategoryMatch> {
        let mut panes = Vec::new();
        let mut matches = Vec::new();

        for meta in page.find_all(page.root(), &self.skin.meta) {
            let pane = page
                .closest(meta, &self.skin.overview_pane)
                .or_else(|| page.closest(meta, &self.skin.related_pane));
            match pane {
                Some(pane) if !panes.contains(&pane) => {
                    panes.push(pane);
                    matches.extend(detail(&self.skin, page, meta));
                }
                _ => {}
            }
        }
        matches
    }
}
