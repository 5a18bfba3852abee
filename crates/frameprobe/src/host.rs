//! Simulated host document.
//!
//! The host embeds the widget frame and renders every trusted protocol
//! message into a visible event log. It never inspects the widget's state,
//! only what crosses the boundary.

use crate::boundary::{MessageBoundary, Subscription};
use crate::message::{kind_of, OriginFilter, RawMessage};
use crate::widget::SearchWidget;
use std::sync::{Arc, Mutex};

/// URL the host document is served from
pub const HOST_URL: &str = "http://localhost:8000/host.html";

/// URL of the embedded widget frame
pub const WIDGET_URL: &str = "http://localhost:8001/widget.html";

/// Heading rendered by the host document
pub const HOST_HEADING: &str = "Host App";

/// Placeholder shown until the first message arrives
pub const LOG_PLACEHOLDER: &str = "Waiting for messages...";

/// Event log rendered by the host
#[derive(Debug)]
pub struct HostLog {
    lines: Arc<Mutex<Vec<String>>>,
    _subscription: Subscription,
}

impl HostLog {
    /// Start rendering messages from `filter`'s origin
    #[must_use]
    pub fn attach(boundary: &MessageBoundary, filter: OriginFilter) -> Self {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let subscription = boundary.subscribe(move |raw| {
            if !filter.accepts(raw) {
                return;
            }
            if let Ok(mut lines) = sink.lock() {
                lines.push(render(raw));
            }
        });
        Self {
            lines,
            _subscription: subscription,
        }
    }

    /// Rendered lines, placeholder included while nothing has arrived
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().map(|l| l.clone()).unwrap_or_default();
        if lines.is_empty() {
            vec![LOG_PLACEHOLDER.to_string()]
        } else {
            lines
        }
    }

    /// Full visible text of the log
    #[must_use]
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    /// Whether the visible text contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }

    /// Number of messages rendered
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }
}

fn render(raw: &RawMessage) -> String {
    format!("{}: {}", kind_of(&raw.data), raw.data)
}

/// The loaded host document with its embedded widget
#[derive(Debug)]
pub struct HostDocument {
    /// Text of the page heading
    pub heading: String,
    /// `src` attribute of the widget iframe
    pub iframe_src: String,
    /// Event log element
    pub log: HostLog,
    /// Widget running inside the iframe
    pub widget: Arc<SearchWidget>,
}

impl HostDocument {
    /// Load the host page and the widget it embeds
    #[must_use]
    pub fn load(boundary: &MessageBoundary, filter: OriginFilter, widget: SearchWidget) -> Self {
        let log = HostLog::attach(boundary, filter);
        tracing::debug!(url = HOST_URL, widget_origin = widget.origin(), "host document loaded");
        Self {
            heading: HOST_HEADING.to_string(),
            iframe_src: WIDGET_URL.to_string(),
            log,
            widget: Arc::new(widget),
        }
    }
}
