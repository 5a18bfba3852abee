//! Page Object Model Support
//!
//! Page objects encapsulate the structure of one page or embedded component
//! so scenarios read as user intent instead of element lookups.

use crate::result::{ProbeError, ProbeResult};
use crate::wait::{wait_until, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use std::time::Duration;

/// Trait for page objects representing a page or component in the UI.
///
/// # Example
///
/// ```ignore
/// struct LoginPage {
///     loaded: bool,
/// }
///
/// impl PageObject for LoginPage {
///     fn url_pattern(&self) -> &str {
///         "/login"
///     }
///
///     fn is_loaded(&self) -> bool {
///         self.loaded
///     }
/// }
/// ```
pub trait PageObject {
    /// URL pattern that matches this page (e.g., "/login", "/users/*")
    fn url_pattern(&self) -> &str;

    /// Check if the page is fully loaded and ready for interaction
    fn is_loaded(&self) -> bool {
        true
    }

    /// Optional wait time for page load (in milliseconds)
    fn load_timeout_ms(&self) -> u64 {
        DEFAULT_WAIT_TIMEOUT_MS
    }

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether `url` matches [`Self::url_pattern`]; `*` matches any run of characters
    fn matches_url(&self, url: &str) -> bool {
        glob_match(self.url_pattern(), url)
    }
}

/// Wait until `page` reports loaded, bounded by its load timeout
pub async fn wait_for_load<P: PageObject + ?Sized>(page: &P) -> ProbeResult<Duration> {
    let options = WaitOptions::new()
        .with_timeout(page.load_timeout_ms())
        .with_poll_interval(DEFAULT_POLL_INTERVAL_MS);
    wait_until(|| page.is_loaded(), &options)
        .await
        .map_err(|e| match e {
            ProbeError::Timeout { ms, .. } => ProbeError::page(format!(
                "{} did not load within {ms}ms",
                page.page_name()
            )),
            other => other,
        })
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
