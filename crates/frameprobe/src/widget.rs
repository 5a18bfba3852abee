//! Simulated Search Widget
//!
//! Catalog-backed stand-in for the embedded third-party widget. It renders
//! results for a query and reports to its host only through the
//! [`MessageBoundary`], exactly like a cross-origin frame would.

use crate::boundary::MessageBoundary;
use crate::config::DEFAULT_TRUSTED_ORIGIN;
use crate::message::{ResultClick, SearchMetrics, WidgetMessage};
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Heading rendered at the top of the widget
pub const WIDGET_HEADING: &str = "External Search Widget";

/// Text shown when a search matched nothing
pub const NO_RESULTS_TEXT: &str = "No results found";

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier reported in `resultClick`
    pub id: i64,
    /// Display title, also the search key
    pub title: String,
}

impl SearchResult {
    /// Create a catalog entry
    #[must_use]
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// The catalog the widget ships with
#[must_use]
pub fn default_catalog() -> Vec<SearchResult> {
    vec![
        SearchResult::new(1, "Playwright Testing Framework"),
        SearchResult::new(2, "Cypress Component Testing"),
        SearchResult::new(3, "Selenium WebDriver"),
    ]
}

/// Interactive element of the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetControl {
    /// The `#query` text input
    QueryInput,
    /// The `#searchBtn` button
    SearchButton,
}

/// How a result item was activated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Pointer click
    Click,
    /// Enter key on the focused item
    Enter,
}

#[derive(Debug, Default)]
struct WidgetState {
    query: String,
    results: Vec<SearchResult>,
    searched: bool,
    focused: Option<usize>,
}

/// Search widget posting protocol messages across a boundary
#[derive(Debug)]
pub struct SearchWidget {
    boundary: MessageBoundary,
    origin: String,
    catalog: Vec<SearchResult>,
    latency: Duration,
    heading: String,
    hidden: Vec<WidgetControl>,
    state: Mutex<WidgetState>,
}

impl SearchWidget {
    /// Widget served from the default widget origin with the default catalog
    #[must_use]
    pub fn new(boundary: MessageBoundary) -> Self {
        Self {
            boundary,
            origin: DEFAULT_TRUSTED_ORIGIN.to_string(),
            catalog: default_catalog(),
            latency: Duration::ZERO,
            heading: WIDGET_HEADING.to_string(),
            hidden: Vec::new(),
            state: Mutex::new(WidgetState::default()),
        }
    }

    /// Render a different heading
    #[must_use]
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = heading.into();
        self
    }

    /// Render without `control`
    #[must_use]
    pub fn with_hidden(mut self, control: WidgetControl) -> Self {
        if !self.hidden.contains(&control) {
            self.hidden.push(control);
        }
        self
    }

    /// Rendered heading text
    #[must_use]
    pub fn heading(&self) -> &str {
        &self.heading
    }

    /// Whether `control` is rendered
    #[must_use]
    pub fn is_visible(&self, control: WidgetControl) -> bool {
        !self.hidden.contains(&control)
    }

    /// Serve the widget from `origin`
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Replace the catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: Vec<SearchResult>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Delay between a user action and its message crossing the boundary
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Origin this widget posts from
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Run a search, render its results and emit one `searchMetrics`.
    ///
    /// Matching is a case-insensitive substring test on the title. A blank
    /// query matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        let results: Vec<SearchResult> = if needle.is_empty() {
            Vec::new()
        } else {
            self.catalog
                .iter()
                .filter(|r| r.title.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        };

        if let Ok(mut state) = self.state.lock() {
            state.query = query.to_string();
            state.results = results.clone();
            state.searched = true;
            state.focused = None;
        }

        tracing::debug!(query, total_results = results.len(), "widget search");
        self.emit(WidgetMessage::SearchMetrics(SearchMetrics {
            query: query.to_string(),
            total_results: results.len() as u64,
        }));
        results
    }

    /// Results currently rendered
    #[must_use]
    pub fn results(&self) -> Vec<SearchResult> {
        self.state
            .lock()
            .map(|s| s.results.clone())
            .unwrap_or_default()
    }

    /// Last submitted query
    #[must_use]
    pub fn query(&self) -> String {
        self.state
            .lock()
            .map(|s| s.query.clone())
            .unwrap_or_default()
    }

    /// Whether a search has completed since load
    #[must_use]
    pub fn has_searched(&self) -> bool {
        self.state.lock().map(|s| s.searched).unwrap_or(false)
    }

    /// Whether the "No results found" message is rendered
    #[must_use]
    pub fn no_results_visible(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.searched && s.results.is_empty())
            .unwrap_or(false)
    }

    /// Index of the focused result item
    #[must_use]
    pub fn focused(&self) -> Option<usize> {
        self.state.lock().ok().and_then(|s| s.focused)
    }

    /// Move keyboard focus to result `index`
    pub fn focus(&self, index: usize) -> ProbeResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProbeError::page("widget state poisoned"))?;
        if index >= state.results.len() {
            return Err(ProbeError::page(format!(
                "no result item at index {index} ({} rendered)",
                state.results.len()
            )));
        }
        state.focused = Some(index);
        Ok(())
    }

    /// Activate result `index` and emit `resultClick` with its id.
    ///
    /// Enter focuses the item first, as a key press would.
    pub fn activate(&self, index: usize, activation: Activation) -> ProbeResult<i64> {
        if activation == Activation::Enter {
            self.focus(index)?;
        }
        let id = self
            .results()
            .get(index)
            .map(|r| r.id)
            .ok_or_else(|| ProbeError::page(format!("no result item at index {index}")))?;

        tracing::debug!(id, ?activation, "widget result activated");
        self.emit(WidgetMessage::ResultClick(ResultClick { id }));
        Ok(id)
    }

    fn emit(&self, message: WidgetMessage) {
        let boundary = self.boundary.clone();
        let origin = self.origin.clone();
        let latency = self.latency;
        let data = message.to_value();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if !latency.is_zero() {
                        tokio::time::sleep(latency).await;
                    }
                    boundary.post(origin, data);
                });
            }
            // No runtime: deliver inline.
            Err(_) => {
                boundary.post(origin, data);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::message::RawMessage;
    use serde_json::json;
    use std::sync::Arc;

    fn recorder(boundary: &MessageBoundary) -> (crate::boundary::Subscription, Arc<Mutex<Vec<RawMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = boundary.subscribe(move |m| sink.lock().unwrap().push(m.clone()));
        (sub, seen)
    }

    mod search_tests {
        use super::*;

        #[test]
        fn test_case_insensitive_match() {
            let widget = SearchWidget::new(MessageBoundary::new());
            let results = widget.search("PLAYwright");
            assert_eq!(results, vec![SearchResult::new(1, "Playwright Testing Framework")]);
            assert!(!widget.no_results_visible());
        }

        #[test]
        fn test_substring_matches_several() {
            let widget = SearchWidget::new(MessageBoundary::new());
            let ids: Vec<_> = widget.search("testing").into_iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![1, 2]);
        }

        #[test]
        fn test_no_match_shows_message() {
            let widget = SearchWidget::new(MessageBoundary::new());
            assert!(!widget.no_results_visible());
            assert!(widget.search("xyz").is_empty());
            assert!(widget.no_results_visible());
            assert_eq!(widget.query(), "xyz");
        }

        #[test]
        fn test_blank_query_matches_nothing() {
            let widget = SearchWidget::new(MessageBoundary::new());
            assert!(widget.search("   ").is_empty());
        }

        #[test]
        fn test_search_emits_metrics_without_runtime() {
            let boundary = MessageBoundary::new();
            let (_sub, seen) = recorder(&boundary);
            let widget = SearchWidget::new(boundary);
            widget.search("xyz");
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].origin, DEFAULT_TRUSTED_ORIGIN);
            assert_eq!(
                *seen[0].data,
                json!({"type": "searchMetrics", "query": "xyz", "totalResults": 0})
            );
        }

        #[tokio::test]
        async fn test_emission_is_deferred_by_latency() {
            let boundary = MessageBoundary::new();
            let (_sub, seen) = recorder(&boundary);
            let widget = SearchWidget::new(boundary).with_latency(Duration::from_millis(30));
            widget.search("playwright");
            assert!(seen.lock().unwrap().is_empty());
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert_eq!(seen.lock().unwrap().len(), 1);
        }
    }

    mod activation_tests {
        use super::*;

        #[test]
        fn test_click_emits_result_id() {
            let boundary = MessageBoundary::new();
            let (_sub, seen) = recorder(&boundary);
            let widget = SearchWidget::new(boundary).with_origin("http://widget.test");
            widget.search("selenium");
            assert_eq!(widget.activate(0, Activation::Click).unwrap(), 3);
            let seen = seen.lock().unwrap();
            assert_eq!(*seen[1].data, json!({"type": "resultClick", "id": 3}));
            assert_eq!(seen[1].origin, "http://widget.test");
        }

        #[test]
        fn test_enter_focuses_and_activates() {
            let widget = SearchWidget::new(MessageBoundary::new());
            widget.search("playwright");
            assert_eq!(widget.focused(), None);
            assert_eq!(widget.activate(0, Activation::Enter).unwrap(), 1);
            assert_eq!(widget.focused(), Some(0));
        }

        #[test]
        fn test_activate_out_of_range() {
            let boundary = MessageBoundary::new();
            let (_sub, seen) = recorder(&boundary);
            let widget = SearchWidget::new(boundary);
            widget.search("xyz");
            assert!(widget.activate(0, Activation::Click).is_err());
            assert!(widget.focus(0).is_err());
            assert_eq!(seen.lock().unwrap().len(), 1, "only the searchMetrics");
        }

        #[test]
        fn test_new_search_clears_focus() {
            let widget = SearchWidget::new(MessageBoundary::new());
            widget.search("testing");
            widget.focus(1).unwrap();
            widget.search("testing");
            assert_eq!(widget.focused(), None);
        }

        #[test]
        fn test_rendered_chrome() {
            let widget = SearchWidget::new(MessageBoundary::new());
            assert_eq!(widget.heading(), WIDGET_HEADING);
            assert!(widget.is_visible(WidgetControl::QueryInput));
            assert!(widget.is_visible(WidgetControl::SearchButton));

            let widget = SearchWidget::new(MessageBoundary::new())
                .with_heading("Broken")
                .with_hidden(WidgetControl::SearchButton)
                .with_hidden(WidgetControl::SearchButton);
            assert_eq!(widget.heading(), "Broken");
            assert!(widget.is_visible(WidgetControl::QueryInput));
            assert!(!widget.is_visible(WidgetControl::SearchButton));
        }

        #[test]
        fn test_custom_catalog() {
            let widget = SearchWidget::new(MessageBoundary::new())
                .with_catalog(vec![SearchResult::new(42, "Rust Book")]);
            widget.search("rust");
            assert_eq!(widget.activate(0, Activation::Click).unwrap(), 42);
        }
    }
}
