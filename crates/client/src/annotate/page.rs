//! The host page as seen by the classifier and renderer.
//!
//! [`PageTree`] is the "locate this logical element" side; [`WidgetMount`]
//! adds the "put a widget here" side. [`HtmlPage`] implements both over a
//! scraper document whose tree can grow and shrink like a live page.

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};

use super::widget::WidgetHandle;
use crate::resolver::parse_selector;
use reelrate_core::Error;

/// Where a widget goes relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Last child of the anchor.
    Append,
    /// Next sibling of the anchor.
    InsertAfter,
}

/// Roots of the subtrees inserted since the last dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub inserted: Vec<NodeId>,
}

impl MutationBatch {
    pub fn new(inserted: Vec<NodeId>) -> Self {
        Self { inserted }
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }
}

/// Structural queries over the page.
///
/// `find` and `find_all` consider the node itself before its descendants;
/// `closest` considers the node itself before its ancestors.
pub trait PageTree {
    /// Root of the observed region.
    fn root(&self) -> NodeId;

    fn matches(&self, node: NodeId, selector: &Selector) -> bool;

    fn find(&self, node: NodeId, selector: &Selector) -> Option<NodeId>;

    fn find_all(&self, node: NodeId, selector: &Selector) -> Vec<NodeId>;

    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId>;

    /// Trimmed text content, `None` when blank.
    fn text(&self, node: NodeId) -> Option<String>;

    /// Trimmed attribute value, `None` when missing or blank.
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
}

/// Widget insertion into the page.
pub trait WidgetMount: PageTree {
    fn has_widget(&self, anchor: NodeId) -> bool;

    /// Insert `widget` at `anchor`. Returns false when the anchor is no longer
    /// part of the page.
    fn mount(&mut self, anchor: NodeId, placement: Placement, widget: WidgetHandle) -> bool;
}

struct Mounted {
    anchor: NodeId,
    node: NodeId,
    widget: WidgetHandle,
}

/// A parsed HTML document acting as the host page.
pub struct HtmlPage {
    html: Html,
    root: NodeId,
    mounts: Vec<Mounted>,
}

impl HtmlPage {
    /// Parse `document`, observing the first element matching `observation_root`
    /// or the whole document when nothing matches.
    pub fn parse(document: &str, observation_root: &str) -> Result<Self, Error> {
        let selector = parse_selector(observation_root)?;
        let html = Html::parse_document(document);
        let root = match html.select(&selector).next() {
            Some(found) => found.id(),
            None => {
                tracing::debug!(observation_root, "observation root not found; observing whole document");
                html.root_element().id()
            }
        };
        Ok(Self { html, root, mounts: Vec::new() })
    }

    /// First element under the observation root matching `selector`.
    pub fn select_first(&self, selector: &str) -> Result<Option<NodeId>, Error> {
        let selector = parse_selector(selector)?;
        Ok(self.find(self.root, &selector))
    }

    /// True while `node` is connected to the document.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let document = self.html.tree.root().id();
        self.html
            .tree
            .get(node)
            .is_some_and(|n| n.id() == document || n.ancestors().any(|a| a.id() == document))
    }

    /// Append the nodes of `fragment` to `parent`.
    ///
    /// Returns the inserted top-level elements, the roots a mutation observer
    /// would report.
    pub fn insert_html(&mut self, parent: NodeId, fragment: &str) -> Vec<NodeId> {
        if !self.is_attached(parent) {
            return Vec::new();
        }

        let fragment = Html::parse_fragment(fragment);
        let mut inserted = Vec::new();

        for top in fragment.root_element().children() {
            let id = graft(&mut self.html.tree, top);
            let Some(mut parent) = self.html.tree.get_mut(parent) else {
                break;
            };
            parent.append_id(id);
            if top.value().is_element() {
                inserted.push(id);
            }
        }

        inserted
    }

    /// Detach `node` and its subtree. Widgets mounted inside it, or anchored
    /// inside it, are detached too; returns how many.
    pub fn remove(&mut self, node: NodeId) -> usize {
        if !self.is_attached(node) {
            return 0;
        }

        let tree = &self.html.tree;
        let inside = |id: NodeId| id == node || tree.get(id).is_some_and(|n| n.ancestors().any(|a| a.id() == node));

        let (gone, kept): (Vec<_>, Vec<_>) =
            self.mounts.drain(..).partition(|m| inside(m.anchor) || inside(m.node));
        self.mounts = kept;

        for mounted in &gone {
            mounted.widget.detach();
        }

        if let Some(mut subtree) = self.html.tree.get_mut(node) {
            subtree.detach();
        }

        gone.len()
    }

    /// Every element under the observation root matching one of `triggers`,
    /// in document order, as a single batch.
    pub fn snapshot_batch(&self, triggers: &[&Selector]) -> MutationBatch {
        let Some(root) = self.html.tree.get(self.root) else {
            return MutationBatch::default();
        };

        let inserted = root
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| triggers.iter().any(|selector| selector.matches(el)))
            .map(|el| el.id())
            .collect();

        MutationBatch { inserted }
    }

    /// Mounted widgets in mount order.
    pub fn widgets(&self) -> Vec<WidgetHandle> {
        self.mounts.iter().map(|m| m.widget.clone()).collect()
    }

    pub fn widget_at(&self, anchor: NodeId) -> Option<WidgetHandle> {
        self.mounts.iter().find(|m| m.anchor == anchor).map(|m| m.widget.clone())
    }

    /// Serialize the page with each widget's current markup in place.
    pub fn render(&self) -> String {
        let mut html = self.html.clone();

        for mounted in &self.mounts {
            let markup = Html::parse_fragment(&mounted.widget.to_html());
            for top in markup.root_element().children() {
                let id = graft(&mut html.tree, top);
                if let Some(mut container) = html.tree.get_mut(mounted.node) {
                    container.append_id(id);
                }
            }
        }

        html.html()
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(node).and_then(ElementRef::wrap)
    }
}

impl PageTree for HtmlPage {
    fn root(&self) -> NodeId {
        self.root
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.element(node).is_some_and(|el| selector.matches(&el))
    }

    fn find(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let el = self.element(node)?;
        if selector.matches(&el) {
            return Some(node);
        }
        el.select(selector).next().map(|found| found.id())
    }

    fn find_all(&self, node: NodeId, selector: &Selector) -> Vec<NodeId> {
        let Some(el) = self.element(node) else {
            return Vec::new();
        };
        let own = selector.matches(&el).then_some(node);
        own.into_iter().chain(el.select(selector).map(|found| found.id())).collect()
    }

    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let start = self.html.tree.get(node)?;
        std::iter::once(start)
            .chain(start.ancestors())
            .filter_map(ElementRef::wrap)
            .find(|el| selector.matches(el))
            .map(|el| el.id())
    }

    fn text(&self, node: NodeId) -> Option<String> {
        let text = self.element(node)?.text().collect::<String>();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let value = self.element(node)?.value().attr(name)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

impl WidgetMount for HtmlPage {
    fn has_widget(&self, anchor: NodeId) -> bool {
        self.mounts.iter().any(|m| m.anchor == anchor)
    }

    fn mount(&mut self, anchor: NodeId, placement: Placement, widget: WidgetHandle) -> bool {
        if !self.is_attached(anchor) {
            return false;
        }

        let container = Html::parse_fragment(container_markup(placement));
        let Some(template) = container.root_element().first_child() else {
            return false;
        };
        let node = graft(&mut self.html.tree, template);

        let Some(mut at) = self.html.tree.get_mut(anchor) else {
            return false;
        };
        match placement {
            Placement::Append => at.append_id(node),
            Placement::InsertAfter => at.insert_id_after(node),
        };

        self.mounts.push(Mounted { anchor, node, widget });
        true
    }
}

fn container_markup(placement: Placement) -> &'static str {
    match placement {
        Placement::Append => r#"<div class="imdb-overlay"></div>"#,
        Placement::InsertAfter => r#"<div class="imdb-container"></div>"#,
    }
}

/// Copy `source` and its subtree into `tree` as an orphan; returns its id.
fn graft(tree: &mut Tree<Node>, source: NodeRef<'_, Node>) -> NodeId {
    let id = tree.orphan(source.value().clone()).id();
    for child in source.children() {
        let child_id = graft(tree, child);
        if let Some(mut parent) = tree.get_mut(id) {
            parent.append_id(child_id);
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::classify::Category;

    const PAGE: &str = r#"
        <html><body>
            <header><div class="meta">outside</div></header>
            <div id="appMountPoint">
                <div class="row">
                    <div class="title-card-container"><p class="fallback-text">Heat</p></div>
                    <div class="title-card-container"><p class="fallback-text"> </p></div>
                </div>
                <img class="logo" alt=" Inception ">
            </div>
        </body></html>
    "#;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn page() -> HtmlPage {
        HtmlPage::parse(PAGE, "#appMountPoint").unwrap()
    }

    #[test]
    fn test_observation_root() {
        let page = page();
        assert!(page.matches(page.root(), &sel("#appMountPoint")));
        assert!(page.find(page.root(), &sel(".meta")).is_none());
    }

    #[test]
    fn test_observation_root_fallback() {
        let page = HtmlPage::parse(PAGE, "#missing").unwrap();
        assert!(page.find(page.root(), &sel("header .meta")).is_some());
    }

    #[test]
    fn test_invalid_observation_root() {
        assert!(matches!(HtmlPage::parse(PAGE, "##"), Err(Error::InvalidSelector(_))));
    }

    #[test]
    fn test_find_includes_self() {
        let page = page();
        let row = page.find(page.root(), &sel(".row")).unwrap();
        assert_eq!(page.find(row, &sel(".row")), Some(row));
        assert_eq!(page.find_all(row, &sel("div")).len(), 3);
    }

    #[test]
    fn test_closest_and_text() {
        let page = page();
        let texts = page.find_all(page.root(), &sel(".fallback-text"));
        assert_eq!(texts.len(), 2);
        assert_eq!(page.text(texts[0]).as_deref(), Some("Heat"));
        assert_eq!(page.text(texts[1]), None);

        let card = page.closest(texts[0], &sel(".title-card-container")).unwrap();
        assert!(page.matches(card, &sel(".title-card-container")));
        assert!(page.closest(texts[0], &sel(".jawBone")).is_none());
    }

    #[test]
    fn test_attr_trimmed() {
        let page = page();
        let logo = page.find(page.root(), &sel(".logo")).unwrap();
        assert_eq!(page.attr(logo, "alt").as_deref(), Some("Inception"));
        assert_eq!(page.attr(logo, "aria-label"), None);
    }

    #[test]
    fn test_insert_html_reports_top_level_elements() {
        let mut page = page();
        let root = page.root();
        let inserted = page.insert_html(root, r#"text <div class="bob-overlay"><p class="bob-title">Heat</p></div><span></span>"#);
        assert_eq!(inserted.len(), 2);
        assert!(page.matches(inserted[0], &sel(".bob-overlay")));
        assert!(page.matches(inserted[0], &sel("#appMountPoint > .bob-overlay")));
    }

    #[test]
    fn test_mount_and_render() {
        let mut page = page();
        let logo = page.find(page.root(), &sel(".logo")).unwrap();
        let widget = WidgetHandle::new(Category::Trailer, "Inception");

        assert!(page.mount(logo, Placement::InsertAfter, widget.clone()));
        assert!(page.has_widget(logo));

        let rendered = page.render();
        let logo_at = rendered.find("Inception").unwrap();
        let widget_at = rendered.find(r#"<div class="imdb-container"><div class="imdb-rating">"#).unwrap();
        assert!(widget_at > logo_at);
        assert!(rendered.contains("fetching.."));
    }

    #[test]
    fn test_remove_detaches_widgets() {
        let mut page = page();
        let row = page.find(page.root(), &sel(".row")).unwrap();
        let card = page.find(row, &sel(".title-card-container")).unwrap();
        let widget = WidgetHandle::new(Category::Card, "Heat");
        assert!(page.mount(card, Placement::Append, widget.clone()));

        assert_eq!(page.remove(row), 1);
        assert!(widget.is_detached());
        assert!(!page.is_attached(card));
        assert!(page.widgets().is_empty());
        assert!(!page.mount(card, Placement::Append, WidgetHandle::new(Category::Card, "Heat")));
    }

    #[test]
    fn test_snapshot_batch_document_order() {
        let page = page();
        let cards = sel(".title-card-container");
        let logo = sel(".logo");
        let batch = page.snapshot_batch(&[&logo, &cards]);
        assert_eq!(batch.inserted.len(), 3);
        assert!(page.matches(batch.inserted[0], &cards));
        assert!(page.matches(batch.inserted[2], &logo));
    }
}
