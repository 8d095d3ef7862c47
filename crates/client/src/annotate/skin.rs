//! Host page markup the classifier keys on.

use scraper::Selector;

use crate::resolver::parse_selector;
use reelrate_core::{Error, SkinConfig};

/// Compiled [`SkinConfig`].
#[derive(Debug, Clone)]
pub struct Skin {
    pub card: Selector,
    pub card_title: Selector,
    pub trailer_row: Selector,
    pub trailer_logo: Selector,
    pub meta: Selector,
    pub detail_pane: Selector,
    pub overview_pane: Selector,
    pub detail_fallback_text: Selector,
    pub detail_logo: Selector,
    pub related_pane: Selector,
    pub related_tile: Selector,
    pub related_artwork: Selector,
    pub index_entry: Selector,
    pub index_title: Selector,
}

impl Skin {
    pub fn compile(config: &SkinConfig) -> Result<Self, Error> {
        Ok(Self {
            card: parse_selector(&config.card)?,
            card_title: parse_selector(&config.card_title)?,
            trailer_row: parse_selector(&config.trailer_row)?,
            trailer_logo: parse_selector(&config.trailer_logo)?,
            meta: parse_selector(&config.meta)?,
            detail_pane: parse_selector(&config.detail_pane)?,
            overview_pane: parse_selector(&config.overview_pane)?,
            detail_fallback_text: parse_selector(&config.detail_fallback_text)?,
            detail_logo: parse_selector(&config.detail_logo)?,
            related_pane: parse_selector(&config.related_pane)?,
            related_tile: parse_selector(&config.related_tile)?,
            related_artwork: parse_selector(&config.related_artwork)?,
            index_entry: parse_selector(&config.index_entry)?,
            index_title: parse_selector(&config.index_title)?,
        })
    }

    /// Elements whose insertion can start a rule, for snapshot batches.
    pub fn triggers(&self) -> [&Selector; 4] {
        [&self.card, &self.trailer_row, &self.meta, &self.index_entry]
    }
}

impl Default for Skin {
    fn default() -> Self {
        Self::compile(&SkinConfig::default()).expect("invalid selector")
    }
}
