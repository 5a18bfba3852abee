//! Frameprobe: Cross-Frame Message Capture for Embedded Widget Tests
//!
//! An embedded widget reports to its host page only through origin-tagged
//! messages. Frameprobe captures those messages in receipt order, keeps only
//! the ones from the trusted widget origin, and lets a test wait for a
//! message kind instead of sleeping.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  post(origin, data)  ┌──────────────────┐
//! │ SearchWidget │─────────────────────►│ MessageBoundary  │
//! │ (or Chromium │                      └────────┬─────────┘
//! │  via bridge) │                 ┌─────────────┴─────────────┐
//! └──────────────┘                 ▼                           ▼
//!                        ┌──────────────────┐        ┌──────────────┐
//!                        │ MessageCapture   │        │ HostLog      │
//!                        │ filter ─► buffer │        │ (event log)  │
//!                        └────────┬─────────┘        └──────────────┘
//!                                 │ wait_for_kind / first_of_kind
//!                                 ▼
//!                        ┌──────────────────┐
//!                        │ Scenario         │
//!                        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use frameprobe::{HarnessConfig, HostPage, MessageBoundary, Scenario};
//!
//! # async fn run() -> frameprobe::ProbeResult<()> {
//! let config = HarnessConfig::from_env()?;
//! let boundary = MessageBoundary::new();
//! let mut host = HostPage::new(boundary.clone(), &config);
//! host.goto().await?;
//! let widget = host.widget()?;
//!
//! let mut scenario = Scenario::new("valid search", boundary, &config);
//! scenario.arm();
//! widget.search("playwright")?;
//! let metrics = scenario.wait_for_kind("searchMetrics", None).await?;
//! assert_eq!(metrics.field("totalResults"), Some(&serde_json::json!(1)));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Isolation boundary between documents
mod boundary;

/// Capture buffer and wait-for-kind synchronization
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod capture;

/// Layered harness configuration
#[allow(clippy::missing_errors_doc)]
mod config;

/// Simulated host document and event log
mod host;

/// Protocol message model and origin filter
mod message;

/// Page Object Model Support
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod page_object;

/// Host and widget page objects
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
mod pages;

/// Error type and result alias
mod result;

/// Scenario driver owning one capture per test case
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation
)]
mod scenario;

/// Bounded-retry waits with push resumption
#[allow(clippy::missing_errors_doc)]
mod wait;

/// Simulated embedded search widget
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation
)]
mod widget;

/// Real-browser bridge over CDP
#[cfg(feature = "browser")]
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod browser;

pub use boundary::{MessageBoundary, Subscription};
pub use capture::{KindWaiter, MessageCapture};
pub use config::{
    HarnessConfig, DEFAULT_TRUSTED_ORIGIN, ENV_POLL_INTERVAL_MS, ENV_TIMEOUT_MS,
    ENV_TRUSTED_ORIGIN,
};
pub use host::{HostDocument, HostLog, HOST_HEADING, HOST_URL, LOG_PLACEHOLDER, WIDGET_URL};
pub use message::{
    kind_of, CapturedMessage, OriginFilter, RawMessage, ResultClick, SearchMetrics,
    WidgetMessage, KIND_FIELD, RESULT_CLICK, SEARCH_METRICS, UNKNOWN_KIND,
};
pub use page_object::{wait_for_load, PageObject};
pub use pages::{HostPage, WidgetPage, ASSERTION_TIMEOUT_MS};
pub use result::{ProbeError, ProbeResult};
pub use scenario::{Scenario, ScenarioSummary};
pub use wait::{
    poll_until, wait_until, Check, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
pub use widget::{
    default_catalog, Activation, SearchResult, SearchWidget, WidgetControl, NO_RESULTS_TEXT,
    WIDGET_HEADING,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Activation, CapturedMessage, HarnessConfig, HostPage, MessageBoundary, MessageCapture,
        PageObject, ProbeError, ProbeResult, Scenario, SearchWidget, WaitOptions, WidgetPage,
        RESULT_CLICK, SEARCH_METRICS,
    };
}
