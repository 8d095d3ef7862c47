//! page_annotate tool implementation.
//!
//! Treats the given HTML as a freshly loaded host page: runs the eager detail
//! pass, then dispatches every trigger element as one mutation batch, and
//! reports the widgets that were mounted.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ServerError;
use reelrate_client::{Annotator, Classifier, HtmlPage, RatingGateway, WidgetHandle};
use reelrate_core::Error;

/// Input parameters for page_annotate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageAnnotateParams {
    /// Host page HTML.
    pub html: String,

    /// Wait for every rating before answering (default: true).
    /// When false, widgets are reported as loading and lookups finish in the background.
    #[serde(default = "default_true")]
    pub wait: bool,
}

fn default_true() -> bool {
    true
}

/// One mounted widget.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WidgetReport {
    pub category: String,
    pub title: String,
    /// loading, error, unscored or scored.
    pub state: String,
    /// Text as displayed, e.g. "8.8/10 (2,300,000 votes)".
    pub text: String,
    /// Opened when the widget is clicked.
    pub detail_url: Option<String>,
    /// Widget markup.
    pub html: String,
}

impl From<&WidgetHandle> for WidgetReport {
    fn from(widget: &WidgetHandle) -> Self {
        Self {
            category: widget.category().as_str().to_string(),
            title: widget.title(),
            state: widget.state().name().to_string(),
            text: widget.text(),
            detail_url: widget.activate(),
            html: widget.to_html(),
        }
    }
}

/// Output structure for page_annotate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageAnnotateOutput {
    pub rendered: usize,
    pub prewarmed: usize,
    pub skipped: usize,
    pub widgets: Vec<WidgetReport>,
    /// The page with widget markup in place.
    pub html: String,
}

/// Implementation of the page_annotate tool.
pub async fn annotate_impl(
    gateway: &RatingGateway, classifier: &Classifier, observation_root: &str, params: PageAnnotateParams,
) -> Result<CallToolResult, McpError> {
    if params.html.trim().is_empty() {
        return Err(ServerError::InvalidInput("html cannot be empty".into()).into());
    }

    let gateway = gateway.clone();
    let classifier = classifier.clone();
    let observation_root = observation_root.to_string();
    let runtime = tokio::runtime::Handle::current();

    // The parsed page is not Send; it lives and dies on this blocking thread.
    let output = tokio::task::spawn_blocking(move || {
        runtime.block_on(annotate(gateway, classifier, &observation_root, params))
    })
    .await
    .map_err(|e| ServerError::AnnotationFailed(e.to_string()))??;

    Ok(json_result(&output))
}

async fn annotate(
    gateway: RatingGateway, classifier: Classifier, observation_root: &str, params: PageAnnotateParams,
) -> Result<PageAnnotateOutput, Error> {
    let mut page = HtmlPage::parse(&params.html, observation_root)?;
    let mut annotator = Annotator::new(classifier, gateway);

    let mut report = annotator.start(&mut page);
    let batch = page.snapshot_batch(&annotator.classifier().skin().triggers());
    report.absorb(annotator.dispatch(&mut page, &batch));

    if params.wait {
        annotator.idle().await;
    } else {
        tracing::debug!(pending = annotator.pending(), "returning before ratings settle");
        annotator.release();
    }

    let widgets = page.widgets().iter().map(WidgetReport::from).collect();
    Ok(PageAnnotateOutput {
        rendered: report.rendered,
        prewarmed: report.prewarmed,
        skipped: report.skipped,
        widgets,
        html: page.render(),
    })
}
