//! Suite configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, a YAML
//! file, `LABPROBE_*` environment variables, and finally whatever the caller
//! (usually the CLI) sets with the `with_*` builders.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::browser::BrowserConfig;
use crate::lab;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{Settle, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};

/// Environment variable overriding [`SuiteConfig::base_url`]
pub const ENV_URL: &str = "LABPROBE_URL";

/// Environment variable overriding [`SuiteConfig::timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "LABPROBE_TIMEOUT_MS";

/// Configuration for one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Page loaded before the tests run
    pub base_url: String,
    /// Per-test timeout, also the default wait for every expectation
    pub timeout_ms: u64,
    /// Timeout for the `before_all` steps
    pub setup_timeout_ms: u64,
    /// Polling interval for waits
    pub poll_interval_ms: u64,
    /// How to let the application settle after navigation
    pub settle: Settle,
    /// Skip remaining tests after the first failure
    pub fail_fast: bool,
    /// Only run tests whose name contains this substring
    pub filter: Option<String>,
    /// Write a PNG of the page here when a test fails
    pub screenshot_dir: Option<PathBuf>,
    /// Browser settings
    pub browser: BrowserConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: lab::DEFAULT_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            setup_timeout_ms: DEFAULT_TIMEOUT_MS * 2,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            settle: Settle::ready(lab::READY_EXPRESSION),
            fail_fast: false,
            filter: None,
            screenshot_dir: None,
            browser: BrowserConfig::default(),
        }
    }
}

impl SuiteConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(raw: &str) -> ProbeResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(raw)?)
    }

    /// Apply `LABPROBE_*` overrides from the process environment
    pub fn with_env_overrides(self) -> ProbeResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `LABPROBE_*` overrides from an arbitrary lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw.trim().parse().map_err(|_| {
                ProbeError::config(format!("{ENV_TIMEOUT_MS} must be an integer, got {raw:?}"))
            })?;
        }
        Ok(self)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-test timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the settle strategy
    #[must_use]
    pub fn with_settle(mut self, settle: Settle) -> Self {
        self.settle = settle;
        self
    }

    /// Set fail fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the test name filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the failure screenshot directory
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Set browser settings
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Wait options derived from this configuration
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 || self.setup_timeout_ms == 0 {
            return Err(ProbeError::config("timeouts must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::config("poll_interval_ms must be greater than zero"));
        }
        if let Settle::Ready {
            expression,
            timeout_ms,
            ..
        } = &self.settle
        {
            if expression.trim().is_empty() || *timeout_ms == 0 {
                return Err(ProbeError::config(
                    "ready settle needs an expression and a non-zero timeout",
                ));
            }
        }
        Ok(())
    }
}
