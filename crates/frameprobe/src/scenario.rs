//! Scenario Driver
//!
//! A [`Scenario`] is one test case: it owns a fresh [`MessageCapture`], tags
//! its log output with a unique id, and tears the capture down when it ends.
//! Typical flow: arm, trigger a UI action, wait for the expected kind, assert
//! on payload fields.

use crate::boundary::MessageBoundary;
use crate::capture::{KindWaiter, MessageCapture};
use crate::config::HarnessConfig;
use crate::message::CapturedMessage;
use crate::result::{ProbeError, ProbeResult};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Outcome of a finished scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    /// Scenario id
    pub id: Uuid,
    /// Scenario name
    pub name: String,
    /// Messages captured in the final session
    pub messages: Vec<CapturedMessage>,
    /// Number of `arm()` calls
    pub arm_count: u64,
    /// Wall time from creation to finish
    pub elapsed: Duration,
}

/// One test case driving a capture
#[derive(Debug)]
pub struct Scenario {
    id: Uuid,
    name: String,
    span: tracing::Span,
    capture: MessageCapture,
    started: Instant,
    finished: bool,
}

impl Scenario {
    /// Start a scenario observing `boundary`
    #[must_use]
    pub fn new(name: impl Into<String>, boundary: MessageBoundary, config: &HarnessConfig) -> Self {
        let name = name.into();
        let id = Uuid::new_v4();
        let span = tracing::info_span!("scenario", %id, name = %name);
        span.in_scope(|| tracing::info!("scenario started"));
        Self {
            id,
            name,
            span,
            capture: MessageCapture::new(boundary, config),
            started: Instant::now(),
            finished: false,
        }
    }

    /// Unique id of this scenario
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Human-readable name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capture this scenario owns
    #[must_use]
    pub const fn capture(&self) -> &MessageCapture {
        &self.capture
    }

    /// Start (or restart) capturing; earlier history is discarded
    pub fn arm(&mut self) {
        let _guard = self.span.enter();
        self.capture.arm();
    }

    /// Snapshot of every captured message in receipt order
    #[must_use]
    pub fn all(&self) -> Vec<CapturedMessage> {
        self.capture.all()
    }

    /// First captured message of `kind`
    #[must_use]
    pub fn first_of_kind(&self, kind: &str) -> Option<CapturedMessage> {
        self.capture.first_of_kind(kind)
    }

    /// Wait for a message of `kind`; `None` uses the configured timeout
    pub async fn wait_for_kind(
        &self,
        kind: &str,
        timeout_ms: Option<u64>,
    ) -> ProbeResult<CapturedMessage> {
        self.capture
            .wait_for_kind(kind, timeout_ms)
            .instrument(self.span.clone())
            .await
    }

    /// Detached waiter on the current session
    pub fn waiter(&self) -> ProbeResult<KindWaiter> {
        self.capture.waiter()
    }

    /// Wait for `kind` and check its payload contains every field of `expected`
    pub async fn expect_message(
        &self,
        kind: &str,
        expected: &Value,
        timeout_ms: Option<u64>,
    ) -> ProbeResult<CapturedMessage> {
        let message = self.wait_for_kind(kind, timeout_ms).await?;
        if message.matches(expected) {
            Ok(message)
        } else {
            Err(ProbeError::assertion(format!(
                "'{kind}' payload {} does not match {expected}",
                message.payload
            )))
        }
    }

    /// End the scenario and release its capture
    pub fn finish(mut self) -> ScenarioSummary {
        let summary = ScenarioSummary {
            id: self.id,
            name: self.name.clone(),
            messages: self.capture.all(),
            arm_count: self.capture.arm_count(),
            elapsed: self.started.elapsed(),
        };
        self.capture.disarm();
        self.finished = true;
        self.span.in_scope(|| {
            tracing::info!(
                captured = summary.messages.len(),
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "scenario finished"
            );
        });
        summary
    }
}

impl Drop for Scenario {
    fn drop(&mut self) {
        if !self.finished {
            self.capture.disarm();
            self.span
                .in_scope(|| tracing::info!("scenario dropped without finish()"));
        }
    }
}
