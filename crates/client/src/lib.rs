//! Client side of reelrate.
//!
//! This crate provides the HTTP fetch pipeline, the rating site resolver,
//! the cache-first rating gateway, and page annotation with rating widgets.

pub mod annotate;
pub mod fetch;
pub mod gateway;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use annotate::{
    Annotator, Category, CategoryMatch, Classifier, DispatchReport, HtmlPage, MutationBatch, PageEvent, PageTree,
    Placement, Skin, SkinConfig, WidgetHandle, WidgetMount, WidgetState,
};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, PageFetcher};
pub use gateway::RatingGateway;
pub use resolver::{ImdbResolver, Resolver, ScrapeSelectors};
