//! Page objects for the host page and the embedded search widget.

use crate::boundary::MessageBoundary;
use crate::config::HarnessConfig;
use crate::host::{HostDocument, HostLog, HOST_HEADING, HOST_URL, LOG_PLACEHOLDER, WIDGET_URL};
use crate::message::OriginFilter;
use crate::page_object::{wait_for_load, PageObject};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{wait_until, WaitOptions};
use crate::widget::{
    Activation, SearchResult, SearchWidget, WidgetControl, NO_RESULTS_TEXT, WIDGET_HEADING,
};
use std::sync::Arc;
use std::time::Duration;

/// How long a retried page assertion keeps checking before failing
pub const ASSERTION_TIMEOUT_MS: u64 = 5_000;

/// Poll interval for retried page assertions
const ASSERTION_POLL_MS: u64 = 20;

async fn eventually<F, D>(timeout_ms: u64, predicate: F, describe: D) -> ProbeResult<()>
where
    F: Fn() -> bool,
    D: FnOnce() -> String,
{
    let options = WaitOptions::new()
        .with_timeout(timeout_ms)
        .with_poll_interval(ASSERTION_POLL_MS);
    wait_until(predicate, &options)
        .await
        .map(|_| ())
        .map_err(|e| match e {
            ProbeError::Timeout { ms, .. } => {
                ProbeError::assertion(format!("{} (waited {ms}ms)", describe()))
            }
            other => other,
        })
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> ProbeResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ProbeError::assertion(message()))
    }
}

// =============================================================================
// HOST PAGE
// =============================================================================

/// The host application page embedding the widget frame
#[derive(Debug)]
pub struct HostPage {
    boundary: MessageBoundary,
    filter: OriginFilter,
    widget_latency: Duration,
    assertion_timeout_ms: u64,
    document: Option<HostDocument>,
}

impl HostPage {
    /// Host page over `boundary`; nothing is loaded until [`Self::goto`]
    #[must_use]
    pub fn new(boundary: MessageBoundary, config: &HarnessConfig) -> Self {
        Self {
            boundary,
            filter: config.origin_filter(),
            widget_latency: Duration::ZERO,
            assertion_timeout_ms: ASSERTION_TIMEOUT_MS,
            document: None,
        }
    }

    /// Delay the widget applies before posting each message
    #[must_use]
    pub const fn with_widget_latency(mut self, latency: Duration) -> Self {
        self.widget_latency = latency;
        self
    }

    /// Override the retry budget of `verify_*` assertions
    #[must_use]
    pub const fn with_assertion_timeout(mut self, timeout_ms: u64) -> Self {
        self.assertion_timeout_ms = timeout_ms;
        self
    }

    /// Navigate to the host page and wait for the widget to become usable
    pub async fn goto(&mut self) -> ProbeResult<()> {
        let widget = SearchWidget::new(self.boundary.clone())
            .with_origin(self.filter.trusted_origin())
            .with_latency(self.widget_latency);
        self.document = Some(HostDocument::load(&self.boundary, self.filter.clone(), widget));
        wait_for_load(&*self).await?;
        tracing::info!(url = HOST_URL, "navigated to host page");
        Ok(())
    }

    fn document(&self) -> ProbeResult<&HostDocument> {
        self.document
            .as_ref()
            .ok_or_else(|| ProbeError::page("host page not loaded: call goto() first"))
    }

    /// The host's event log
    pub fn event_log(&self) -> ProbeResult<&HostLog> {
        Ok(&self.document()?.log)
    }

    /// Page object for the widget inside the iframe
    pub fn widget(&self) -> ProbeResult<WidgetPage> {
        let document = self.document()?;
        Ok(WidgetPage::new(Arc::clone(&document.widget))
            .with_assertion_timeout(self.assertion_timeout_ms))
    }

    /// Heading reads "Host App" and the widget frame is present
    pub fn verify_host_page_loaded(&self) -> ProbeResult<()> {
        let document = self.document()?;
        ensure(document.heading.contains(HOST_HEADING), || {
            format!("expected heading to contain {HOST_HEADING:?}, got {:?}", document.heading)
        })?;
        ensure(!document.iframe_src.is_empty(), || {
            "widget frame is not visible".to_string()
        })
    }

    /// The iframe points at the widget URL
    pub fn verify_iframe_source(&self) -> ProbeResult<()> {
        let src = &self.document()?.iframe_src;
        ensure(src == WIDGET_URL, || {
            format!("expected iframe src {WIDGET_URL:?}, got {src:?}")
        })
    }

    /// The event log is rendered and still shows its placeholder
    pub fn verify_event_log_visible(&self) -> ProbeResult<()> {
        let log = self.event_log()?;
        ensure(log.contains("Waiting for messages"), || {
            format!("expected event log to show {LOG_PLACEHOLDER:?}, got {:?}", log.text())
        })
    }

    /// The event log eventually contains `text`
    pub async fn verify_event_log_contains(&self, text: &str) -> ProbeResult<()> {
        let log = self.event_log()?;
        eventually(
            self.assertion_timeout_ms,
            || log.contains(text),
            || format!("expected event log to contain {text:?}, got {:?}", log.text()),
        )
        .await
    }
}

impl PageObject for HostPage {
    fn url_pattern(&self) -> &str {
        HOST_URL
    }

    fn is_loaded(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|d| d.widget.is_visible(WidgetControl::QueryInput))
    }

    fn page_name(&self) -> &str {
        "HostPage"
    }
}

// =============================================================================
// WIDGET PAGE
// =============================================================================

/// The search widget as seen through the host's iframe
#[derive(Debug, Clone)]
pub struct WidgetPage {
    widget: Arc<SearchWidget>,
    assertion_timeout_ms: u64,
}

impl WidgetPage {
    /// Page object over an already rendered widget
    #[must_use]
    pub fn new(widget: Arc<SearchWidget>) -> Self {
        Self {
            widget,
            assertion_timeout_ms: ASSERTION_TIMEOUT_MS,
        }
    }

    /// Override the retry budget of `wait_for_results`
    #[must_use]
    pub const fn with_assertion_timeout(mut self, timeout_ms: u64) -> Self {
        self.assertion_timeout_ms = timeout_ms;
        self
    }

    /// The underlying widget
    #[must_use]
    pub fn widget(&self) -> &SearchWidget {
        &self.widget
    }

    /// Titles of the rendered result items
    #[must_use]
    pub fn result_titles(&self) -> Vec<String> {
        self.widget.results().into_iter().map(|r| r.title).collect()
    }

    /// Heading reads "External Search Widget"; query input and search button are visible
    pub fn verify_widget_loaded(&self) -> ProbeResult<()> {
        let heading = self.widget.heading();
        ensure(heading.contains(WIDGET_HEADING), || {
            format!("expected widget heading to contain {WIDGET_HEADING:?}, got {heading:?}")
        })?;
        ensure(self.widget.is_visible(WidgetControl::QueryInput), || {
            "query input is not visible".to_string()
        })?;
        ensure(self.widget.is_visible(WidgetControl::SearchButton), || {
            "search button is not visible".to_string()
        })
    }

    /// Clear the query input, type `query` and press the search button
    pub fn search(&self, query: &str) -> ProbeResult<Vec<SearchResult>> {
        for control in [WidgetControl::QueryInput, WidgetControl::SearchButton] {
            if !self.widget.is_visible(control) {
                return Err(ProbeError::page(format!("cannot search: {control:?} is not visible")));
            }
        }
        tracing::debug!(query, "widget page search");
        Ok(self.widget.search(query))
    }

    /// Wait until the results container is rendered
    pub async fn wait_for_results(&self) -> ProbeResult<()> {
        let widget = &self.widget;
        eventually(
            self.assertion_timeout_ms,
            || widget.has_searched(),
            || "results container never became visible".to_string(),
        )
        .await
    }

    /// At least one result item is shown and the items contain `expected_text`
    pub fn verify_results_displayed(&self, expected_text: &str) -> ProbeResult<()> {
        let titles = self.result_titles();
        ensure(!titles.is_empty(), || "no result items are visible".to_string())?;
        ensure(titles.iter().any(|t| t.contains(expected_text)), || {
            format!("expected result items to contain {expected_text:?}, got {titles:?}")
        })
    }

    /// The "No results found" message is shown
    pub fn verify_no_results_message(&self) -> ProbeResult<()> {
        ensure(self.widget.no_results_visible(), || {
            format!("expected {NO_RESULTS_TEXT:?} to be visible")
        })
    }

    /// Whether the "No results found" message is shown
    #[must_use]
    pub fn no_results_message_visible(&self) -> bool {
        self.widget.no_results_visible()
    }

    /// Zero result items are rendered
    pub fn verify_no_result_items(&self) -> ProbeResult<()> {
        let count = self.widget.results().len();
        ensure(count == 0, || format!("expected 0 result items, found {count}"))
    }

    /// Click the first result item
    pub fn click_first_result(&self) -> ProbeResult<i64> {
        self.widget.activate(0, Activation::Click)
    }

    /// Give keyboard focus to the first result item
    pub fn focus_first_result(&self) -> ProbeResult<()> {
        self.widget.focus(0)
    }

    /// Press Enter on the first result item
    pub fn press_enter_on_first_result(&self) -> ProbeResult<i64> {
        self.widget.activate(0, Activation::Enter)
    }
}

impl PageObject for WidgetPage {
    fn url_pattern(&self) -> &str {
        WIDGET_URL
    }

    fn is_loaded(&self) -> bool {
        self.verify_widget_loaded().is_ok()
    }

    fn page_name(&self) -> &str {
        "WidgetPage"
    }
}
