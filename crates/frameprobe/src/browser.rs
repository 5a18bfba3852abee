//! Real-browser bridge.
//!
//! Drives a headless Chromium over CDP and forwards every `message` event the
//! host page receives into a [`MessageBoundary`], so the same
//! [`MessageCapture`](crate::capture::MessageCapture) observes a real page.
//! Origin filtering stays on the Rust side: the in-page listener queues every
//! message together with its `event.origin`.
//!
//! Console output and uncaught page errors are recorded as [`ConsoleMessage`]s
//! for debugging failed scenarios.

use crate::boundary::MessageBoundary;
use crate::message::RawMessage;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::DEFAULT_POLL_INTERVAL_MS;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::js_protocol::runtime::{
    EventConsoleApiCalled, EventExceptionThrown, RemoteObject,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Installs the queueing listener once per document
const INSTALL_LISTENER_JS: &str = r"(() => {
    if (window.__frameprobeQueue) { return true; }
    window.__frameprobeQueue = [];
    window.addEventListener('message', (event) => {
        window.__frameprobeQueue.push({ origin: event.origin, data: event.data });
    });
    return true;
})()";

/// Returns and clears the queued records
const DRAIN_QUEUE_JS: &str = r"(() => {
    const queue = window.__frameprobeQueue || [];
    window.__frameprobeQueue = [];
    return queue;
})()";

/// Launch options for the bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Disable the Chromium sandbox (containers/CI)
    pub sandbox: bool,
    /// Path to a Chromium binary; `None` auto-detects
    pub chromium_path: Option<String>,
    /// Interval between queue drains
    pub pump_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            chromium_path: None,
            pump_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl BridgeConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the drain interval in milliseconds
    #[must_use]
    pub const fn with_pump_interval(mut self, ms: u64) -> Self {
        self.pump_interval_ms = ms;
        self
    }
}

#[derive(Debug, Deserialize)]
struct QueuedMessage {
    origin: String,
    #[serde(default)]
    data: Value,
}

// =============================================================================
// CONSOLE CAPTURE
// =============================================================================

/// Console message severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleSeverity {
    /// console.log, console.debug
    Log,
    /// console.info
    Info,
    /// console.warn
    Warn,
    /// console.error, console.assert, uncaught exceptions
    Error,
}

impl fmt::Display for ConsoleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl ConsoleSeverity {
    /// Map a `Runtime.consoleAPICalled` type name
    #[must_use]
    pub fn from_cdp_type(kind: &str) -> Self {
        match kind {
            "error" | "assert" => Self::Error,
            "warning" | "warn" => Self::Warn,
            "info" => Self::Info,
            _ => Self::Log,
        }
    }
}

/// Console output or uncaught error observed in the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleMessage {
    /// Severity level
    pub severity: ConsoleSeverity,
    /// Message text, arguments joined by spaces
    pub text: String,
    /// Whether this came from an uncaught exception rather than `console.*`
    pub page_error: bool,
}

impl ConsoleMessage {
    /// A `console.*` call
    #[must_use]
    pub fn new(severity: ConsoleSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            page_error: false,
        }
    }

    /// An uncaught page error
    #[must_use]
    pub fn page_error(text: impl Into<String>) -> Self {
        Self {
            severity: ConsoleSeverity::Error,
            text: text.into(),
            page_error: true,
        }
    }

    /// Check if message contains substring (case-insensitive)
    #[must_use]
    pub fn contains(&self, substring: &str) -> bool {
        self.text.to_lowercase().contains(&substring.to_lowercase())
    }
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.page_error {
            write!(f, "ERROR: {}", self.text)
        } else {
            write!(f, "{}: {}", self.severity, self.text)
        }
    }
}

#[derive(Debug, Default)]
struct ConsoleLog {
    entries: std::sync::Mutex<Vec<ConsoleMessage>>,
}

impl ConsoleLog {
    fn push(&self, message: ConsoleMessage) {
        tracing::debug!(
            severity = %message.severity,
            page_error = message.page_error,
            text = %message.text,
            "page console"
        );
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(message);
        }
    }

    fn snapshot(&self) -> Vec<ConsoleMessage> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

fn remote_object_text(object: &RemoteObject) -> String {
    match &object.value {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => object.description.clone().unwrap_or_default(),
    }
}

/// Wire name of a CDP enum value
fn cdp_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

async fn watch_console(
    page: &CdpPage,
    log: &Arc<ConsoleLog>,
) -> ProbeResult<Vec<tokio::task::JoinHandle<()>>> {
    let mut console = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(browser_error)?;
    let mut exceptions = page
        .event_listener::<EventExceptionThrown>()
        .await
        .map_err(browser_error)?;

    let sink = Arc::clone(log);
    let console_task = tokio::spawn(async move {
        while let Some(event) = console.next().await {
            let text = event
                .args
                .iter()
                .map(remote_object_text)
                .collect::<Vec<_>>()
                .join(" ");
            let severity = ConsoleSeverity::from_cdp_type(&cdp_name(&event.r#type));
            sink.push(ConsoleMessage::new(severity, text));
        }
    });

    let sink = Arc::clone(log);
    let exception_task = tokio::spawn(async move {
        while let Some(event) = exceptions.next().await {
            let details = &event.exception_details;
            let text = details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or_else(|| details.text.clone());
            sink.push(ConsoleMessage::page_error(text));
        }
    });

    Ok(vec![console_task, exception_task])
}

fn browser_error(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::Browser {
        message: e.to_string(),
    }
}

/// Chromium session pumping page messages into a boundary
#[derive(Debug)]
pub struct BrowserBridge {
    browser: Arc<Mutex<CdpBrowser>>,
    page: Arc<CdpPage>,
    boundary: MessageBoundary,
    handler: tokio::task::JoinHandle<()>,
    pump: Option<tokio::task::JoinHandle<()>>,
    console: Arc<ConsoleLog>,
    console_tasks: Vec<tokio::task::JoinHandle<()>>,
    config: BridgeConfig,
}

impl BrowserBridge {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: BridgeConfig, boundary: MessageBoundary) -> ProbeResult<Self> {
        let mut builder = CdpConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(browser_error)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(browser_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(browser_error)?;
        let console = Arc::new(ConsoleLog::default());
        let console_tasks = watch_console(&page, &console).await?;
        tracing::info!(headless = config.headless, "browser bridge launched");

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            page: Arc::new(page),
            boundary,
            handler,
            pump: None,
            console,
            console_tasks,
            config,
        })
    }

    /// Navigate the page and install the message listener
    pub async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.page.goto(url).await.map_err(browser_error)?;
        self.page
            .evaluate(INSTALL_LISTENER_JS)
            .await
            .map_err(browser_error)?;
        tracing::info!(url, "browser bridge navigated");
        Ok(())
    }

    /// Drain queued page messages into the boundary now.
    ///
    /// Call before `arm()` to keep messages from an earlier step out of a
    /// fresh capture session.
    pub async fn flush(&self) -> ProbeResult<usize> {
        drain(&self.page, &self.boundary).await
    }

    /// Start draining in the background at the configured interval
    pub fn start_pump(&mut self) {
        if self.pump.is_some() {
            return;
        }
        let page = Arc::clone(&self.page);
        let boundary = self.boundary.clone();
        let interval = Duration::from_millis(self.config.pump_interval_ms.max(1));
        self.pump = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = drain(&page, &boundary).await {
                    tracing::warn!(error = %e, "browser bridge pump stopped");
                    break;
                }
            }
        }));
    }

    /// Stop the background pump
    pub fn stop_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }

    /// Console output and page errors recorded since launch
    #[must_use]
    pub fn console_messages(&self) -> Vec<ConsoleMessage> {
        self.console.snapshot()
    }

    /// Uncaught page errors recorded since launch
    #[must_use]
    pub fn page_errors(&self) -> Vec<ConsoleMessage> {
        self.console
            .snapshot()
            .into_iter()
            .filter(|m| m.page_error)
            .collect()
    }

    /// Whether any recorded console line contains `text` (case-insensitive)
    #[must_use]
    pub fn console_contains(&self, text: &str) -> bool {
        self.console.snapshot().iter().any(|m| m.contains(text))
    }

    /// Evaluate a script in the page and decode its result
    pub async fn evaluate<T: serde::de::DeserializeOwned>(&self, expr: &str) -> ProbeResult<T> {
        let result = self.page.evaluate(expr).await.map_err(browser_error)?;
        result.into_value().map_err(browser_error)
    }

    /// Close the browser
    pub async fn close(mut self) -> ProbeResult<()> {
        self.stop_pump();
        self.browser
            .lock()
            .await
            .close()
            .await
            .map_err(browser_error)?;
        for task in self.console_tasks.drain(..) {
            task.abort();
        }
        self.handler.abort();
        Ok(())
    }
}

async fn drain(page: &CdpPage, boundary: &MessageBoundary) -> ProbeResult<usize> {
    let queued: Vec<QueuedMessage> = page
        .evaluate(DRAIN_QUEUE_JS)
        .await
        .map_err(browser_error)?
        .into_value()
        .map_err(browser_error)?;
    let count = queued.len();
    for message in queued {
        boundary.post_raw(&RawMessage::new(message.origin, message.data));
    }
    if count > 0 {
        tracing::debug!(count, "browser bridge drained page messages");
    }
    Ok(count)
}
