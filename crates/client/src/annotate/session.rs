//! One page context's lifetime: mutations in, widgets out, cache persisted.
//!
//! The session applies host page mutations to the [`HtmlPage`], dispatches
//! the inserted roots, flushes the store when the page is hidden or unloaded,
//! and merges other contexts' writes when the page becomes visible again.

use std::sync::Arc;

use ego_tree::NodeId;
use tokio::sync::mpsc;

use super::page::{HtmlPage, MutationBatch};
use super::{Annotator, DispatchReport};
use reelrate_core::RatingStore;

/// A structural change made by the host page.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// `html` appended under `parent`.
    Inserted { parent: NodeId, html: String },
    /// `node` and its subtree left the page.
    Removed(NodeId),
}

/// Lifecycle and mutation events of a page context.
#[derive(Debug, Clone)]
pub enum PageEvent {
    Mutations(Vec<Mutation>),
    Hidden,
    Visible,
    Unload,
}

/// Totals over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub dispatched: DispatchReport,
    pub flushes: usize,
    pub reloads: usize,
}

/// Drive `page` until `Unload` or until the event stream ends.
///
/// Store sync with other contexts runs for the duration of the session.
/// Lookups still in flight at the end are left to `annotator`.
pub async fn run(page: &mut HtmlPage, annotator: &mut Annotator, mut events: mpsc::Receiver<PageEvent>) -> SessionSummary {
    let store = Arc::clone(annotator.gateway().store());
    let sync = store.spawn_sync();
    let mut summary = SessionSummary::default();

    tracing::info!(context = %store.context(), "page session started");
    summary.dispatched.absorb(annotator.start(page));

    while let Some(event) = events.recv().await {
        match event {
            PageEvent::Mutations(mutations) => {
                let batch = apply(page, mutations);
                if !batch.is_empty() {
                    summary.dispatched.absorb(annotator.dispatch(page, &batch));
                }
            }
            PageEvent::Hidden => flush(&store, &mut summary).await,
            PageEvent::Visible => match store.reload().await {
                Ok(adopted) => {
                    summary.reloads += 1;
                    tracing::debug!(adopted, "rating cache reloaded");
                }
                Err(e) => tracing::warn!(error = %e, "failed to reload rating cache"),
            },
            PageEvent::Unload => break,
        }
    }

    flush(&store, &mut summary).await;
    sync.abort();
    tracing::info!(context = %store.context(), flushes = summary.flushes, "page session ended");

    summary
}

fn apply(page: &mut HtmlPage, mutations: Vec<Mutation>) -> MutationBatch {
    let mut inserted = Vec::new();
    for mutation in mutations {
        match mutation {
            Mutation::Inserted { parent, html } => inserted.extend(page.insert_html(parent, &html)),
            Mutation::Removed(node) => {
                let detached = page.remove(node);
                if detached > 0 {
                    tracing::debug!(detached, "widgets detached with removed subtree");
                }
            }
        }
    }
    MutationBatch::new(inserted)
}

async fn flush(store: &RatingStore, summary: &mut SessionSummary) {
    match store.flush().await {
        Ok(entries) => {
            summary.flushes += 1;
            tracing::debug!(entries, "rating cache persisted");
        }
        Err(e) => tracing::warn!(error = %e, "failed to persist rating cache"),
    }
}
