//! Page annotation: classify inserted subtrees, mount rating widgets, resolve them.
//!
//! ### Flow
//! 1. The host page reports inserted subtree roots as a [`MutationBatch`]
//! 2. The [`Classifier`] turns each root into zero or more [`CategoryMatch`]es
//! 3. Renderable matches mount a loading [`WidgetHandle`] unless the anchor has one
//! 4. Resolution runs in the background through the [`RatingGateway`] and settles the widget
//! 5. Index entries only warm the cache

pub mod classify;
pub mod page;
pub mod session;
pub mod skin;
pub mod widget;

pub use classify::{Category, CategoryMatch, Classifier};
pub use page::{HtmlPage, MutationBatch, PageTree, Placement, WidgetMount};
pub use session::{Mutation, PageEvent, SessionSummary};
pub use reelrate_core::SkinConfig;
pub use skin::Skin;
pub use widget::{WidgetHandle, WidgetState};

use tokio::task::JoinSet;

use crate::gateway::RatingGateway;

/// Outcome counts of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Widgets mounted.
    pub rendered: usize,
    /// Silent lookups started.
    pub prewarmed: usize,
    /// Matches whose anchor already had a widget or had left the page.
    pub skipped: usize,
}

impl DispatchReport {
    pub fn absorb(&mut self, other: DispatchReport) {
        self.rendered += other.rendered;
        self.prewarmed += other.prewarmed;
        self.skipped += other.skipped;
    }
}

/// Dispatcher from page mutations to widgets and lookups.
pub struct Annotator {
    classifier: Classifier,
    gateway: RatingGateway,
    tasks: JoinSet<()>,
}

impl Annotator {
    pub fn new(classifier: Classifier, gateway: RatingGateway) -> Self {
        Self { classifier, gateway, tasks: JoinSet::new() }
    }

    pub fn gateway(&self) -> &RatingGateway {
        &self.gateway
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Eager pass over what the page already shows. Only the detail view is
    /// considered; everything else waits for mutations.
    pub fn start<P: WidgetMount>(&mut self, page: &mut P) -> DispatchReport {
        let matches = self.classifier.scan_existing(&*page);
        self.apply(page, matches)
    }

    /// Handle one batch of inserted roots.
    pub fn dispatch<P: WidgetMount>(&mut self, page: &mut P, batch: &MutationBatch) -> DispatchReport {
        let mut report = DispatchReport::default();
        for &root in &batch.inserted {
            let matches = self.classifier.classify(&*page, root);
            report.absorb(self.apply(page, matches));
        }
        report
    }

    fn apply<P: WidgetMount>(&mut self, page: &mut P, matches: Vec<CategoryMatch>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for found in matches {
            if found.category.is_prewarm() {
                let gateway = self.gateway.clone();
                self.tasks.spawn(async move {
                    let _ = gateway.get_rating(&found.title).await;
                });
                report.prewarmed += 1;
                continue;
            }

            if page.has_widget(found.anchor) {
                report.skipped += 1;
                continue;
            }

            let widget = WidgetHandle::new(found.category, found.title.clone());
            if !page.mount(found.anchor, found.placement, widget.clone()) {
                report.skipped += 1;
                continue;
            }

            let gateway = self.gateway.clone();
            self.tasks.spawn(async move {
                let outcome = gateway.get_rating(&found.title).await;
                if !widget.settle(outcome) {
                    tracing::debug!(title = %found.title, "widget gone before its rating arrived");
                }
            });
            report.rendered += 1;
        }

        if report != DispatchReport::default() {
            tracing::debug!(
                rendered = report.rendered,
                prewarmed = report.prewarmed,
                skipped = report.skipped,
                "dispatched"
            );
        }
        report
    }

    /// Number of lookups still running.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Let running lookups finish on their own after the annotator is gone.
    pub fn release(mut self) {
        self.tasks.detach_all();
    }

    /// Wait for every lookup started so far.
    pub async fn idle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "rating lookup task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedResolver;
    use reelrate_core::{CacheLifetime, MemoryBackend, RatingStore};
    use std::sync::Arc;

    const DETAIL: &str = r#"
        <html><body><div id="appMountPoint">
          <div class="jawBone">
            <h3 class="image-fallback-text">Inception</h3>
            <div class="overview"><div class="meta">2010</div></div>
          </div>
          <div class="lolomo"></div>
        </div></body></html>
    "#;

    async fn annotator(resolver: &ScriptedResolver) -> Annotator {
        let store = RatingStore::open(Arc::new(MemoryBackend::new()), CacheLifetime::default()).await;
        let gateway = RatingGateway::new(Arc::new(store), Arc::new(resolver.clone()));
        Annotator::new(Classifier::default(), gateway)
    }

    fn lolomo(page: &HtmlPage) -> ego_tree::NodeId {
        page.select_first(".lolomo").unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_start_renders_existing_overview() {
        let resolver = ScriptedResolver::new().rated("Inception", "8.8", "2,300,000");
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();

        let report = annotator.start(&mut page);
        assert_eq!(report.rendered, 1);
        assert_eq!(page.widgets()[0].state(), WidgetState::Loading);

        annotator.idle().await;
        let widget = page.widgets()[0].clone();
        assert_eq!(widget.category(), Category::Overview);
        assert_eq!(widget.text(), "8.8/10 (2,300,000 votes)");
        assert_eq!(widget.activate().as_deref(), Some("https://www.imdb.com/title/inception/"));
    }

    #[tokio::test]
    async fn test_start_counts_related_tiles_once() {
        let resolver = ScriptedResolver::new();
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(
            r#"<div id="appMountPoint"><div class="jawBone"><div class="moreLikeThis">
                 <div class="simsLockup"><img class="video-artwork" alt="Heat"><div class="meta">1995</div></div>
                 <div class="simsLockup"><img class="video-artwork" alt="Ronin"><div class="meta">1998</div></div>
                 <div class="simsLockup"><img class="video-artwork" alt="Collateral"><div class="meta">2004</div></div>
               </div></div></div>"#,
            "#appMountPoint",
        )
        .unwrap();

        let report = annotator.start(&mut page);
        annotator.idle().await;

        assert_eq!(report, DispatchReport { rendered: 3, prewarmed: 0, skipped: 0 });
        assert_eq!(resolver.calls(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_notification_renders_once() {
        let resolver = ScriptedResolver::new().rated("Heat", "8.3", "700,000");
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();
        let parent = lolomo(&page);

        let roots = page.insert_html(parent, r#"<div class="bob-overlay"><p class="bob-title">Heat</p></div>"#);
        let batch = MutationBatch::new(roots);

        assert_eq!(annotator.dispatch(&mut page, &batch).rendered, 1);
        let again = annotator.dispatch(&mut page, &batch);
        assert_eq!(again, DispatchReport { rendered: 0, prewarmed: 0, skipped: 1 });

        annotator.idle().await;
        assert_eq!(page.widgets().len(), 1);
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_rating_renders_na() {
        let resolver = ScriptedResolver::new();
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();
        let parent = lolomo(&page);

        let roots = page.insert_html(
            parent,
            r#"<div class="billboard-row"><img class="title-logo" alt="Obscure Short Film"></div>"#,
        );
        annotator.dispatch(&mut page, &MutationBatch::new(roots));
        annotator.idle().await;

        let widget = page.widgets()[0].clone();
        assert_eq!(widget.state(), WidgetState::Unscored);
        assert!(page.render().contains("N/A"));
    }

    #[tokio::test]
    async fn test_transport_error_renders_error() {
        let resolver = ScriptedResolver::new();
        resolver.set_failing(true);
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();

        annotator.start(&mut page);
        annotator.idle().await;

        assert_eq!(page.widgets()[0].state(), WidgetState::Error);
        assert!(annotator.gateway().store().is_empty().await);
    }

    #[tokio::test]
    async fn test_prewarm_fills_cache_without_widgets() {
        let resolver = ScriptedResolver::new().rated("Heat", "8.3", "700,000");
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();
        let parent = lolomo(&page);

        let roots = page.insert_html(
            parent,
            r#"<div class="row"><div class="title-card-container"><p class="fallback-text">Heat</p></div></div>"#,
        );
        let report = annotator.dispatch(&mut page, &MutationBatch::new(roots));
        assert_eq!(report.prewarmed, 1);
        assert_eq!(report.rendered, 0);

        annotator.idle().await;
        assert!(page.widgets().is_empty());
        assert!(annotator.gateway().store().get("Heat").await.is_some());
    }

    #[tokio::test]
    async fn test_removed_anchor_is_not_settled() {
        let resolver = ScriptedResolver::new()
            .rated("Heat", "8.3", "700,000")
            .with_delay(std::time::Duration::from_millis(20));
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();
        let parent = lolomo(&page);

        let roots = page.insert_html(parent, r#"<div class="bob-overlay"><p class="bob-title">Heat</p></div>"#);
        annotator.dispatch(&mut page, &MutationBatch::new(roots.clone()));
        let widget = page.widget_at(roots[0]).unwrap();

        page.remove(roots[0]);
        annotator.idle().await;

        assert!(widget.is_detached());
        assert_eq!(widget.state(), WidgetState::Loading);
        assert!(annotator.gateway().store().get("Heat").await.is_some());
    }

    #[tokio::test]
    async fn test_snapshot_batch_annotates_everything_once() {
        let resolver = ScriptedResolver::new();
        let mut annotator = annotator(&resolver).await;
        let mut page = HtmlPage::parse(DETAIL, "#appMountPoint").unwrap();
        let parent = lolomo(&page);
        page.insert_html(
            parent,
            r#"<div class="bob-overlay"><p class="bob-title">Heat</p></div>
               <div class="title-card-container"><p class="fallback-text">Ronin</p></div>"#,
        );

        let first = annotator.start(&mut page);
        let batch = page.snapshot_batch(&annotator.classifier().skin().triggers());
        let second = annotator.dispatch(&mut page, &batch);
        annotator.idle().await;

        assert_eq!(first.rendered, 1);
        assert_eq!(second, DispatchReport { rendered: 1, prewarmed: 1, skipped: 1 });
        assert_eq!(page.widgets().len(), 2);
    }
}
