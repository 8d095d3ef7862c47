//! Selector strings for the host page the annotator runs against.

use serde::{Deserialize, Serialize};

/// One selector per logical element of the host page.
///
/// Nested under `[skin]` in the config file; single entries can be
/// overridden with `REELRATE_SKIN__<FIELD>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    pub card: String,
    pub card_title: String,
    pub trailer_row: String,
    pub trailer_logo: String,
    pub meta: String,
    pub detail_pane: String,
    pub overview_pane: String,
    pub detail_fallback_text: String,
    pub detail_logo: String,
    pub related_pane: String,
    pub related_tile: String,
    pub related_artwork: String,
    pub index_entry: String,
    pub index_title: String,
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            card: ".bob-overlay".into(),
            card_title: ".bob-title".into(),
            trailer_row: ".billboard-row".into(),
            trailer_logo: ".title-logo".into(),
            meta: ".meta".into(),
            detail_pane: ".jawBone".into(),
            overview_pane: ".overview".into(),
            detail_fallback_text: ".image-fallback-text".into(),
            detail_logo: ".logo".into(),
            related_pane: ".moreLikeThis".into(),
            related_tile: ".simsLockup".into(),
            related_artwork: ".video-artwork".into(),
            index_entry: ".title-card-container".into(),
            index_title: ".fallback-text".into(),
        }
    }
}

impl SkinConfig {
    /// Every selector with its field name, for validation and error messages.
    pub fn entries(&self) -> [(&'static str, &str); 14] {
        [
            ("card", &self.card),
            ("card_title", &self.card_title),
            ("trailer_row", &self.trailer_row),
            ("trailer_logo", &self.trailer_logo),
            ("meta", &self.meta),
            ("detail_pane", &self.detail_pane),
            ("overview_pane", &self.overview_pane),
            ("detail_fallback_text", &self.detail_fallback_text),
            ("detail_logo", &self.detail_logo),
            ("related_pane", &self.related_pane),
            ("related_tile", &self.related_tile),
            ("related_artwork", &self.related_artwork),
            ("index_entry", &self.index_entry),
            ("index_title", &self.index_title),
        ]
    }
}
