//! Harness configuration.
//!
//! Layering order: built-in defaults, then an optional YAML document, then
//! `FRAMEPROBE_*` environment variables.

use crate::message::OriginFilter;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Origin the embedded search widget is served from
pub const DEFAULT_TRUSTED_ORIGIN: &str = "http://localhost:8001";

/// Environment variable overriding [`HarnessConfig::trusted_origin`]
pub const ENV_TRUSTED_ORIGIN: &str = "FRAMEPROBE_TRUSTED_ORIGIN";

/// Environment variable overriding [`HarnessConfig::default_timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "FRAMEPROBE_TIMEOUT_MS";

/// Environment variable overriding [`HarnessConfig::poll_interval_ms`]
pub const ENV_POLL_INTERVAL_MS: &str = "FRAMEPROBE_POLL_INTERVAL_MS";

/// Harness-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// The single sender origin the capture buffer accepts
    pub trusted_origin: String,
    /// Timeout for `wait_for_kind` when the caller supplies none
    pub default_timeout_ms: u64,
    /// Maximum time between buffer re-checks while waiting
    pub poll_interval_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trusted_origin: DEFAULT_TRUSTED_ORIGIN.to_string(),
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl HarnessConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trusted origin
    #[must_use]
    pub fn with_trusted_origin(mut self, origin: impl Into<String>) -> Self {
        self.trusted_origin = origin.into();
        self
    }

    /// Set the default wait timeout in milliseconds
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the poll interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Parse a YAML document, filling missing keys with defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> ProbeResult<Self> {
        Self::default().with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `FRAMEPROBE_*` overrides read through `lookup`
    pub fn with_env_from<F>(mut self, lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origin) = lookup(ENV_TRUSTED_ORIGIN) {
            self.trusted_origin = origin;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.default_timeout_ms = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations the harness cannot run with
    pub fn validate(&self) -> ProbeResult<()> {
        if self.trusted_origin.trim().is_empty() {
            return Err(ProbeError::Config {
                message: "trusted_origin must not be empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::Config {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Origin filter for this configuration
    #[must_use]
    pub fn origin_filter(&self) -> OriginFilter {
        OriginFilter::new(self.trusted_origin.clone())
    }

    /// Default wait options for this configuration
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.default_timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }
}

fn parse_millis(key: &str, raw: &str) -> ProbeResult<u64> {
    raw.trim().parse().map_err(|_| ProbeError::Config {
        message: format!("{key} must be a whole number of milliseconds, got {raw:?}"),
    })
}
