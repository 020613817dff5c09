//! labprobe: browser-driven smoke tests for JupyterLab extensions
//!
//! Suites are plain data ([`TestSuite`]) run by a [`TestHarness`] against any
//! [`PageDriver`]: a real Chromium page over CDP ([`ChromiumDriver`], feature
//! `browser`) or the in-memory [`MockDriver`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     LABPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ TestSuite  │    │ Test       │    │ PageDriver │            │
//! │   │ (YAML or   │───►│ Harness    │───►│ chromium / │            │
//! │   │  built-in) │    │            │    │ mock       │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use labprobe::prelude::*;
//!
//! # async fn run() -> ProbeResult<()> {
//! let config = SuiteConfig::default().with_env_overrides()?;
//! let suite = lab::jupyterlab_suite(&config);
//! let mut driver = lab::fixture_driver();
//! let results = TestHarness::from_config(&config).run(&suite, &mut driver).await;
//! assert!(results.all_passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
mod config;
mod driver;
mod harness;
pub mod lab;
mod locator;
mod result;
mod selector;
mod wait;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use config::{SuiteConfig, ENV_TIMEOUT_MS, ENV_URL};
pub use driver::{BoundingBox, ElementHandle, MockDriver, MockElement, PageDriver, Point};
pub use harness::{
    sanitize_file_name, Step, SuiteResults, TestCase, TestHarness, TestResult, TestStatus,
    TestSuite,
};
pub use locator::{get_one, Expectation};
pub use result::{FailureKind, ProbeError, ProbeResult};
pub use selector::Selector;
pub use wait::{
    is_truthy, sleep, wait_for, wait_until, Settle, WaitOptions, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SETTLE_MS, DEFAULT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::harness::*;
    pub use super::lab;
    pub use super::locator::*;
    pub use super::result::*;
    pub use super::selector::*;
    pub use super::wait::*;
}
