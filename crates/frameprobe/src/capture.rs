//! Capture Buffer and Synchronization Primitive
//!
//! [`MessageCapture`] listens on a [`MessageBoundary`], keeps every message
//! from the trusted origin in receipt order, and lets scenario code wait for
//! a message kind without hand-written sleep loops.
//!
//! # Session lifecycle
//!
//! ```text
//!   new() ──► arm() ──► [append ...] ──► arm() ──► [append ...] ──► disarm()/drop
//!              │                          │                          │
//!              └ fresh empty buffer       └ old buffer closed,       └ buffer closed
//!                subscription installed     fresh empty buffer
//! ```
//!
//! Re-arming always resets: history captured before the second `arm()` is
//! never visible afterwards.

use crate::boundary::{MessageBoundary, Subscription};
use crate::config::HarnessConfig;
use crate::message::{CapturedMessage, OriginFilter, RawMessage};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, Check, WaitOptions, WaitResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Ordered store for one armed session.
///
/// Growth is unbounded: a session lives for one scenario.
#[derive(Debug, Default)]
struct CaptureBuffer {
    messages: Mutex<Vec<CapturedMessage>>,
    appended: Notify,
    closed: AtomicBool,
}

impl CaptureBuffer {
    fn append(&self, raw: &RawMessage) {
        let captured = match self.messages.lock() {
            Ok(mut messages) => {
                let captured = CapturedMessage::from_raw(raw, messages.len() as u64);
                messages.push(captured.clone());
                captured
            }
            Err(_) => return,
        };
        tracing::debug!(
            kind = %captured.kind,
            sequence = captured.sequence,
            "captured message"
        );
        self.appended.notify_waiters();
    }

    fn snapshot(&self) -> Vec<CapturedMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn first_of_kind(&self, kind: &str) -> Option<CapturedMessage> {
        self.messages
            .lock()
            .ok()
            .and_then(|m| m.iter().find(|msg| msg.is_kind(kind)).cloned())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.appended.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_kind(&self, kind: &str) -> Check<CapturedMessage> {
        match self.first_of_kind(kind) {
            Some(message) => Check::Ready(message),
            None if self.is_closed() => Check::Abandoned,
            None => Check::Pending,
        }
    }
}

async fn wait_on(
    buffer: &CaptureBuffer,
    kind: &str,
    options: &WaitOptions,
) -> ProbeResult<WaitResult<CapturedMessage>> {
    poll_until(kind, Some(&buffer.appended), options, || {
        buffer.check_kind(kind)
    })
    .await
}

#[derive(Debug)]
struct ArmedSession {
    buffer: Arc<CaptureBuffer>,
    // Held for its Drop: removes the boundary listener.
    _subscription: Subscription,
}

/// Origin-filtered message capture owned by one scenario
#[derive(Debug)]
pub struct MessageCapture {
    boundary: MessageBoundary,
    filter: OriginFilter,
    options: WaitOptions,
    session: Option<ArmedSession>,
    arm_count: u64,
}

impl MessageCapture {
    /// Create an unarmed capture for `boundary` using `config`
    #[must_use]
    pub fn new(boundary: MessageBoundary, config: &HarnessConfig) -> Self {
        Self {
            boundary,
            filter: config.origin_filter(),
            options: config.wait_options(),
            session: None,
            arm_count: 0,
        }
    }

    /// Create an unarmed capture with an explicit filter and wait options
    #[must_use]
    pub fn with_filter(boundary: MessageBoundary, filter: OriginFilter, options: WaitOptions) -> Self {
        Self {
            boundary,
            filter,
            options,
            session: None,
            arm_count: 0,
        }
    }

    /// Start (or restart) capturing.
    ///
    /// The listener is installed before this returns, so any message posted
    /// afterwards is observed. A previous session is closed and its history
    /// discarded.
    pub fn arm(&mut self) {
        self.end_session();

        let buffer = Arc::new(CaptureBuffer::default());
        let sink = Arc::clone(&buffer);
        let filter = self.filter.clone();
        let subscription = self.boundary.subscribe(move |raw| {
            if filter.accepts(raw) {
                sink.append(raw);
            } else {
                tracing::debug!(origin = %raw.origin, "dropped message from untrusted origin");
            }
        });

        self.arm_count += 1;
        self.session = Some(ArmedSession {
            buffer,
            _subscription: subscription,
        });
        tracing::info!(
            trusted_origin = self.filter.trusted_origin(),
            arm_count = self.arm_count,
            "message capture armed"
        );
    }

    /// Stop capturing and close the current session.
    ///
    /// Detached waiters still pending fail with [`ProbeError::Cancelled`].
    pub fn disarm(&mut self) {
        if self.end_session() {
            tracing::info!(arm_count = self.arm_count, "message capture disarmed");
        }
    }

    fn end_session(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                drop(session._subscription);
                session.buffer.close();
                true
            }
            None => false,
        }
    }

    /// Whether a session is active
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.session.is_some()
    }

    /// How many times `arm()` has been called
    #[must_use]
    pub const fn arm_count(&self) -> u64 {
        self.arm_count
    }

    /// The trusted origin this capture accepts
    #[must_use]
    pub fn trusted_origin(&self) -> &str {
        self.filter.trusted_origin()
    }

    /// Default wait options used by [`Self::wait_for_kind`]
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.options
    }

    /// Snapshot of every captured message in receipt order
    #[must_use]
    pub fn all(&self) -> Vec<CapturedMessage> {
        self.session
            .as_ref()
            .map(|s| s.buffer.snapshot())
            .unwrap_or_default()
    }

    /// First captured message of `kind`, if any has arrived
    #[must_use]
    pub fn first_of_kind(&self, kind: &str) -> Option<CapturedMessage> {
        self.session
            .as_ref()
            .and_then(|s| s.buffer.first_of_kind(kind))
    }

    /// Every captured message of `kind`, in receipt order
    #[must_use]
    pub fn of_kind(&self, kind: &str) -> Vec<CapturedMessage> {
        self.all().into_iter().filter(|m| m.is_kind(kind)).collect()
    }

    /// Number of captured messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.buffer.len())
    }

    /// Whether nothing has been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pretty-printed JSON of the captured history
    pub fn to_json_pretty(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(&self.all())?)
    }

    /// Wait until a message of `kind` has been captured and return it.
    ///
    /// `timeout_ms = None` uses the configured default. Resolves at once if
    /// such a message is already buffered.
    pub async fn wait_for_kind(
        &self,
        kind: &str,
        timeout_ms: Option<u64>,
    ) -> ProbeResult<CapturedMessage> {
        let mut options = self.options;
        if let Some(ms) = timeout_ms {
            options = options.with_timeout(ms);
        }
        Ok(self.wait_for_kind_with(kind, &options).await?.value)
    }

    /// [`Self::wait_for_kind`] with explicit options and timing details
    pub async fn wait_for_kind_with(
        &self,
        kind: &str,
        options: &WaitOptions,
    ) -> ProbeResult<WaitResult<CapturedMessage>> {
        let session = self.session.as_ref().ok_or_else(|| ProbeError::NotArmed {
            operation: format!("waiting for '{kind}'"),
        })?;
        wait_on(&session.buffer, kind, options).await
    }

    /// Detached handle on the current session, for use from spawned tasks
    pub fn waiter(&self) -> ProbeResult<KindWaiter> {
        let session = self.session.as_ref().ok_or_else(|| ProbeError::NotArmed {
            operation: "creating a waiter".to_string(),
        })?;
        Ok(KindWaiter {
            buffer: Arc::clone(&session.buffer),
            options: self.options,
        })
    }
}

impl Drop for MessageCapture {
    fn drop(&mut self) {
        self.end_session();
    }
}

/// Owned waiter bound to one capture session.
///
/// Outlives borrows of the [`MessageCapture`], but not its session: once the
/// session ends every pending wait fails with [`ProbeError::Cancelled`].
#[derive(Debug, Clone)]
pub struct KindWaiter {
    buffer: Arc<CaptureBuffer>,
    options: WaitOptions,
}

impl KindWaiter {
    /// Wait until a message of `kind` has been captured in this session
    pub async fn wait_for_kind(
        &self,
        kind: &str,
        timeout_ms: Option<u64>,
    ) -> ProbeResult<CapturedMessage> {
        let mut options = self.options;
        if let Some(ms) = timeout_ms {
            options = options.with_timeout(ms);
        }
        Ok(wait_on(&self.buffer, kind, &options).await?.value)
    }

    /// Whether the session this waiter belongs to has ended
    #[must_use]
    pub fn is_session_closed(&self) -> bool {
        self.buffer.is_closed()
    }
}
