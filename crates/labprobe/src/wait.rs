//! Wait mechanisms: fixed pauses, polling, and post-navigation settling.
//!
//! A fixed pause after navigation is the traditional way to let a single-page
//! app boot, and it is inherently racy: too short on a loaded CI machine, too
//! long everywhere else. [`Settle::Ready`] polls an explicit readiness
//! predicate instead and is what the JupyterLab suite uses by default.

use crate::driver::{ElementHandle, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for waits and for whole tests (15 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Fixed settle time used when no readiness signal is configured
pub const DEFAULT_SETTLE_MS: u64 = 3_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Suspend the current task for `ms` milliseconds
pub async fn sleep(ms: u64) {
    trace!(ms, "sleeping");
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Poll `probe` until it yields `Some`, an error, or the timeout elapses.
///
/// The probe always runs at least once, even with a zero timeout.
pub async fn wait_until<T, F, Fut>(what: &str, options: WaitOptions, mut check: F) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut polls = 0_u32;
    loop {
        polls += 1;
        if let Some(value) = check().await? {
            debug!(what, polls, elapsed_ms = start.elapsed().as_millis() as u64, "wait satisfied");
            return Ok(value);
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(ProbeError::Timeout {
                what: what.to_string(),
                ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval().min(timeout - elapsed)).await;
    }
}

/// Wait until `selector` matches at least one element and return every match
pub async fn wait_for<D>(
    driver: &D,
    selector: &Selector,
    options: WaitOptions,
) -> ProbeResult<Vec<ElementHandle>>
where
    D: PageDriver + ?Sized,
{
    let what = selector.to_string();
    wait_until(&what, options, move || async move {
        let found = driver.query_all(selector).await?;
        Ok((!found.is_empty()).then_some(found))
    })
    .await
}

// =============================================================================
// SETTLE
// =============================================================================

/// How to let the application settle after navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Settle {
    /// Proceed immediately
    None,
    /// Sleep for a fixed duration
    Fixed {
        /// Duration in milliseconds
        ms: u64,
    },
    /// Poll a JavaScript predicate until it is truthy
    Ready {
        /// Expression evaluated in page context
        expression: String,
        /// Give up after this long
        timeout_ms: u64,
        /// Delay between readiness checks
        poll_interval_ms: u64,
    },
}

impl Default for Settle {
    fn default() -> Self {
        Self::Fixed {
            ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl Settle {
    /// Readiness predicate with default timings
    #[must_use]
    pub fn ready(expression: impl Into<String>) -> Self {
        Self::Ready {
            expression: expression.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS * 2,
        }
    }

    /// Apply the strategy against `driver`.
    ///
    /// Evaluation errors while polling count as "not ready yet": the page's
    /// execution context is routinely torn down while an app is booting.
    pub async fn apply<D>(&self, driver: &D) -> ProbeResult<()>
    where
        D: PageDriver + ?Sized,
    {
        match self {
            Self::None => Ok(()),
            Self::Fixed { ms } => {
                info!(ms, "settling for a fixed duration");
                sleep(*ms).await;
                Ok(())
            }
            Self::Ready {
                expression,
                timeout_ms,
                poll_interval_ms,
            } => {
                info!(timeout_ms, "waiting for readiness signal");
                let options = WaitOptions::new()
                    .with_timeout(*timeout_ms)
                    .with_poll_interval(*poll_interval_ms);
                let expression = expression.as_str();
                wait_until("application readiness", options, move || async move {
                    match driver.evaluate(expression).await {
                        Ok(value) => Ok(is_truthy(&value).then_some(())),
                        Err(ProbeError::Evaluation { message }) => {
                            trace!(%message, "readiness check failed");
                            Ok(None)
                        }
                        Err(e) => Err(e),
                    }
                })
                .await
            }
        }
    }
}

/// JavaScript truthiness of a JSON value
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}
