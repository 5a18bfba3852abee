//! Result and error types for Frameprobe.

use thiserror::Error;

/// Result type for Frameprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in Frameprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No message of the requested kind arrived before the deadline
    #[error("Timed out after {ms}ms waiting for a '{kind}' message")]
    Timeout {
        /// Message kind that was awaited
        kind: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The capture session ended while a wait was still pending
    #[error("Wait for a '{kind}' message was cancelled: capture session ended")]
    Cancelled {
        /// Message kind that was awaited
        kind: String,
    },

    /// A capture operation was used before `arm()`
    #[error("Message capture is not armed: call arm() before {operation}")]
    NotArmed {
        /// Operation that required an armed capture
        operation: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Page error (unknown element, page not loaded, ...)
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Invalid harness configuration
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Browser (CDP) failure
    #[error("Browser error: {message}")]
    Browser {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Build an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Build a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Whether this error is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error is a cancelled wait
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
