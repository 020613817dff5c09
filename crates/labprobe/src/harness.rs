//! Test harness for running suites against a page.
//!
//! A suite is data: `before_all` steps run once, then each test's steps run
//! in order against the same page. Steps that assert (`click`,
//! `match_element`) are counted, and a test may declare how many it expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use serde_yaml_ng::with::singleton_map_recursive;
use tracing::{error, info, warn};

use crate::config::SuiteConfig;
use crate::driver::PageDriver;
use crate::locator::Expectation;
use crate::result::{FailureKind, ProbeError, ProbeResult};
use crate::selector::Selector;
use crate::wait::{self, Settle, WaitOptions};

/// One action in a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Load a URL
    Navigate {
        /// Target URL
        url: String,
    },
    /// Pause for a fixed duration
    Sleep {
        /// Duration in milliseconds
        ms: u64,
    },
    /// Let the application settle
    Settle(Settle),
    /// Expect exactly one clickable match and click it
    Click(Selector),
    /// Expect exactly one match with the given text/visibility
    MatchElement {
        /// Base selector
        selector: Selector,
        /// Substring the text must contain
        #[serde(default)]
        text: Option<String>,
        /// Whether the element must be visible
        #[serde(default)]
        visible: bool,
    },
}

impl Step {
    /// Navigate step
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate { url: url.into() }
    }

    /// Match a visible element containing `text`
    #[must_use]
    pub fn match_visible(selector: Selector, text: impl Into<String>) -> Self {
        Self::MatchElement {
            selector,
            text: Some(text.into()),
            visible: true,
        }
    }

    /// The assertion this step makes, if any
    #[must_use]
    pub fn expectation(&self) -> Option<Expectation> {
        match self {
            Self::Click(selector) => Some(Expectation::click(selector.clone())),
            Self::MatchElement {
                selector,
                text,
                visible,
            } => Some(Expectation::MatchElement {
                selector: selector.clone(),
                text: text.clone(),
                visible: *visible,
            }),
            Self::Navigate { .. } | Self::Sleep { .. } | Self::Settle(_) => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate {url}"),
            Self::Sleep { ms } => write!(f, "sleep {ms}ms"),
            Self::Settle(settle) => write!(f, "settle {settle:?}"),
            Self::Click(_) | Self::MatchElement { .. } => match self.expectation() {
                Some(exp) => write!(f, "{exp}"),
                None => Ok(()),
            },
        }
    }
}

/// A single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Test name
    pub name: String,
    /// Number of assertions the test must make
    #[serde(default)]
    pub expected_assertions: Option<usize>,
    /// Steps, run in order
    pub steps: Vec<Step>,
}

impl TestCase {
    /// Create a new test case
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_assertions: None,
            steps: Vec::new(),
        }
    }

    /// Declare how many assertions the test makes
    #[must_use]
    pub const fn with_expected_assertions(mut self, count: usize) -> Self {
        self.expected_assertions = Some(count);
        self
    }

    /// Append a step
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// A test suite containing multiple tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Steps run once before any test
    #[serde(default)]
    pub before_all: Vec<Step>,
    /// Tests in this suite
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// Create a new test suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before_all: Vec::new(),
            tests: Vec::new(),
        }
    }

    /// Append a `before_all` step
    #[must_use]
    pub fn with_before_all(mut self, step: Step) -> Self {
        self.before_all.push(step);
        self
    }

    /// Add a test case
    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Get the number of tests
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Parse a suite from YAML text.
    ///
    /// Steps and selectors are single-key maps (`click: { css: "#go" }`).
    pub fn from_yaml_str(raw: &str) -> ProbeResult<Self> {
        let suite: Self =
            singleton_map_recursive::deserialize(serde_yaml_ng::Deserializer::from_str(raw))?;
        if suite.tests.is_empty() {
            return Err(ProbeError::config(format!(
                "suite {:?} defines no tests",
                suite.name
            )));
        }
        Ok(suite)
    }

    /// Load a suite from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ProbeResult<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    /// Tests whose name contains `filter` (all tests when `None`)
    #[must_use]
    pub fn selected<'a>(&'a self, filter: Option<&'a str>) -> Vec<&'a TestCase> {
        self.tests
            .iter()
            .filter(|t| filter.map_or(true, |f| t.name.contains(f)))
            .collect()
    }
}

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped after an earlier failure in fail-fast mode
    Skipped,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Outcome
    pub status: TestStatus,
    /// Error message if failed
    pub error: Option<String>,
    /// Failure classification if failed
    pub failure_kind: Option<FailureKind>,
    /// Assertions made
    pub assertions: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Failure screenshot, when one was captured
    pub screenshot: Option<PathBuf>,
}

impl TestResult {
    fn pass(name: &str, assertions: usize, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Passed,
            error: None,
            failure_kind: None,
            assertions,
            duration_ms: duration.as_millis() as u64,
            screenshot: None,
        }
    }

    fn fail(name: &str, error: &ProbeError, assertions: usize, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Failed,
            error: Some(error.to_string()),
            failure_kind: Some(error.kind()),
            assertions,
            duration_ms: duration.as_millis() as u64,
            screenshot: None,
        }
    }

    fn setup_failed(name: &str, error: &ProbeError) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Failed,
            error: Some(format!("before_all failed: {error}")),
            failure_kind: Some(error.kind()),
            assertions: 0,
            duration_ms: 0,
            screenshot: None,
        }
    }

    fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Skipped,
            error: None,
            failure_kind: None,
            assertions: 0,
            duration_ms: 0,
            screenshot: None,
        }
    }

    /// Whether the test passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Results from running a test suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Error from the `before_all` steps, if they failed
    pub setup_error: Option<String>,
    /// Individual test results
    pub results: Vec<TestResult>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl SuiteResults {
    /// Check if all tests passed (an empty run passes)
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.setup_error.is_none() && self.results.iter().all(TestResult::passed)
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Count skipped tests
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Failed)
            .collect()
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Test harness for running suites
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// Wait options handed to every expectation
    pub wait: WaitOptions,
    /// Per-test timeout
    pub test_timeout_ms: u64,
    /// Timeout for the `before_all` steps
    pub setup_timeout_ms: u64,
    /// Whether to stop on first failure
    pub fail_fast: bool,
    /// Only run tests whose name contains this
    pub filter: Option<String>,
    /// Where to write failure screenshots
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::from_config(&SuiteConfig::default())
    }
}

impl TestHarness {
    /// Create a new test harness
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a harness from suite configuration
    #[must_use]
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            wait: config.wait_options(),
            test_timeout_ms: config.timeout_ms,
            setup_timeout_ms: config.setup_timeout_ms,
            fail_fast: config.fail_fast,
            filter: config.filter.clone(),
            screenshot_dir: config.screenshot_dir.clone(),
        }
    }

    /// Enable fail-fast mode
    #[must_use]
    pub const fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Set the per-test timeout and the default wait timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.test_timeout_ms = ms;
        self.wait.timeout_ms = ms;
        self
    }

    /// Run a test suite against `driver`
    pub async fn run<D>(&self, suite: &TestSuite, driver: &mut D) -> SuiteResults
    where
        D: PageDriver + ?Sized,
    {
        let start = Instant::now();
        let selected = suite.selected(self.filter.as_deref());
        info!(suite = %suite.name, tests = selected.len(), "running suite");

        let mut setup_assertions = 0;
        let setup = tokio::time::timeout(
            Duration::from_millis(self.setup_timeout_ms),
            self.run_steps(&suite.before_all, driver, &mut setup_assertions),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProbeError::Timeout {
                what: "before_all".to_string(),
                ms: self.setup_timeout_ms,
            })
        });

        let mut results = Vec::with_capacity(selected.len());
        let setup_error = match setup {
            Ok(()) => {
                let mut stop = false;
                for test in selected {
                    if stop {
                        results.push(TestResult::skipped(&test.name));
                        continue;
                    }
                    let result = self.run_test(test, driver).await;
                    stop = self.fail_fast && !result.passed();
                    results.push(result);
                }
                None
            }
            Err(e) => {
                error!(error = %e, "before_all failed");
                for test in selected {
                    results.push(TestResult::setup_failed(&test.name, &e));
                }
                Some(e.to_string())
            }
        };

        SuiteResults {
            suite_name: suite.name.clone(),
            setup_error,
            results,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn run_test<D>(&self, test: &TestCase, driver: &mut D) -> TestResult
    where
        D: PageDriver + ?Sized,
    {
        let start = Instant::now();
        let mut assertions = 0;
        let outcome = tokio::time::timeout(
            Duration::from_millis(self.test_timeout_ms),
            self.run_steps(&test.steps, driver, &mut assertions),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProbeError::Timeout {
                what: format!("test {:?}", test.name),
                ms: self.test_timeout_ms,
            })
        })
        .and_then(|()| match test.expected_assertions {
            Some(expected) if expected != assertions => Err(ProbeError::AssertionCount {
                expected,
                actual: assertions,
            }),
            _ => Ok(()),
        });

        match outcome {
            Ok(()) => {
                info!(test = %test.name, assertions, "passed");
                TestResult::pass(&test.name, assertions, start.elapsed())
            }
            Err(e) => {
                error!(test = %test.name, error = %e, "failed");
                let mut result = TestResult::fail(&test.name, &e, assertions, start.elapsed());
                result.screenshot = self.capture_failure(&*driver, &test.name).await;
                result
            }
        }
    }

    async fn run_steps<D>(
        &self,
        steps: &[Step],
        driver: &mut D,
        assertions: &mut usize,
    ) -> ProbeResult<()>
    where
        D: PageDriver + ?Sized,
    {
        for step in steps {
            match step {
                Step::Navigate { url } => driver.navigate(url).await?,
                Step::Sleep { ms } => wait::sleep(*ms).await,
                Step::Settle(settle) => settle.apply(&*driver).await?,
                Step::Click(_) | Step::MatchElement { .. } => {
                    if let Some(expectation) = step.expectation() {
                        *assertions += 1;
                        expectation.evaluate(driver, self.wait).await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn capture_failure<D>(&self, driver: &D, test_name: &str) -> Option<PathBuf>
    where
        D: PageDriver + ?Sized,
    {
        let dir = self.screenshot_dir.as_ref()?;
        let path = dir.join(format!("{}.png", sanitize_file_name(test_name)));
        let written = async {
            let png = driver.screenshot().await?;
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, png).await?;
            Ok::<(), ProbeError>(())
        }
        .await;
        match written {
            Ok(()) => {
                info!(path = %path.display(), "saved failure screenshot");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "could not save failure screenshot");
                None
            }
        }
    }
}

/// Map a test name to a safe file stem
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "test".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};

    fn fast_harness() -> TestHarness {
        let mut harness = TestHarness::new().with_timeout(1_000);
        harness.wait = WaitOptions::new().with_timeout(100).with_poll_interval(2);
        harness
    }

    fn toggle_page() -> MockDriver {
        MockDriver::new()
            .with_element(MockElement::new("btn", "button").with_id("go").reveals("msg"))
            .with_element(MockElement::new("msg", "p").with_text("Hello there").hidden())
    }

    fn toggle_test() -> TestCase {
        TestCase::new("shows a greeting")
            .with_expected_assertions(2)
            .with_step(Step::Click(Selector::css("#go")))
            .with_step(Step::match_visible(Selector::css("p"), "Hello"))
    }

    mod step_tests {
        use super::*;

        #[test]
        fn test_expectation_mapping() {
            assert!(Step::navigate("http://x").expectation().is_none());
            assert!(Step::Sleep { ms: 1 }.expectation().is_none());
            assert!(matches!(
                Step::Click(Selector::css("a")).expectation(),
                Some(Expectation::Click { .. })
            ));
        }

        #[test]
        fn test_display() {
            assert_eq!(Step::Sleep { ms: 3000 }.to_string(), "sleep 3000ms");
            assert_eq!(
                Step::Click(Selector::css("#go")).to_string(),
                "click css=#go"
            );
        }

        #[test]
        fn test_sanitize_file_name() {
            assert_eq!(
                sanitize_file_name("should show a 'Data Explorer' tab"),
                "should_show_a__Data_Explorer__tab"
            );
            assert_eq!(sanitize_file_name("???"), "test");
        }
    }

    mod yaml_tests {
        use super::*;

        const SUITE: &str = r##"
name: demo
before_all:
  - navigate: { url: "http://localhost:8080/lab?reset" }
  - sleep: { ms: 10 }
  - settle: { strategy: fixed, ms: 3000 }
tests:
  - name: opens panel
    expected_assertions: 2
    steps:
      - click: { css: "#go" }
      - match_element:
          selector: { css: p }
          text: Hello
          visible: true
      - click: { xpath: "//li[@title='Data Browser']" }
"##;

        #[test]
        fn test_parse_suite() {
            let suite = TestSuite::from_yaml_str(SUITE).unwrap();
            assert_eq!(suite.name, "demo");
            assert_eq!(suite.before_all.len(), 3);
            assert_eq!(suite.before_all[2], Step::Settle(Settle::Fixed { ms: 3000 }));
            assert_eq!(suite.tests[0].expected_assertions, Some(2));
            assert_eq!(suite.tests[0].steps[0], Step::Click(Selector::css("#go")));
            assert_eq!(
                suite.tests[0].steps[2],
                Step::Click(Selector::xpath("//li[@title='Data Browser']"))
            );
            assert_eq!(
                suite.tests[0].steps[1],
                Step::match_visible(Selector::css("p"), "Hello")
            );
        }

        #[test]
        fn test_unknown_step_rejected() {
            let err = TestSuite::from_yaml_str(
                "name: odd\ntests:\n  - name: t\n    steps:\n      - hover: { css: a }\n",
            )
            .unwrap_err();
            assert!(err.to_string().contains("hover"), "{err}");
        }

        #[test]
        fn test_empty_suite_rejected() {
            let err = TestSuite::from_yaml_str("name: empty\ntests: []\n").unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_passing_suite() {
            let mut suite = TestSuite::new("toggle").with_before_all(Step::navigate("http://t/"));
            suite.add_test(toggle_test());
            let mut driver = toggle_page();

            let results = fast_harness().run(&suite, &mut driver).await;
            assert!(results.all_passed(), "{results:?}");
            assert_eq!(results.passed_count(), 1);
            assert_eq!(results.results[0].assertions, 2);
            assert_eq!(driver.history(), ["navigate:http://t/", "click:btn"]);
        }

        #[tokio::test]
        async fn test_assertion_count_mismatch() {
            let mut suite = TestSuite::new("count");
            suite.add_test(
                TestCase::new("one assertion")
                    .with_expected_assertions(2)
                    .with_step(Step::Click(Selector::css("#go"))),
            );
            let results = fast_harness().run(&suite, &mut toggle_page()).await;
            let failure = &results.results[0];
            assert_eq!(failure.status, TestStatus::Failed);
            assert_eq!(failure.failure_kind, Some(FailureKind::Mismatch));
            assert!(failure.error.as_deref().unwrap().contains("Expected 2 assertions"));
        }

        #[tokio::test]
        async fn test_missing_element_fails_with_timeout() {
            let mut suite = TestSuite::new("missing");
            suite.add_test(
                TestCase::new("absent")
                    .with_step(Step::match_visible(Selector::css(".nope"), "x")),
            );
            let results = fast_harness().run(&suite, &mut MockDriver::new()).await;
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.results[0].failure_kind, Some(FailureKind::Timeout));
        }

        #[tokio::test]
        async fn test_test_timeout_enforced() {
            let mut suite = TestSuite::new("slow");
            suite.add_test(TestCase::new("sleeps").with_step(Step::Sleep { ms: 5_000 }));
            let results = fast_harness().run(&suite, &mut MockDriver::new()).await;
            let failure = &results.results[0];
            assert_eq!(failure.failure_kind, Some(FailureKind::Timeout));
            assert!(failure.error.as_deref().unwrap().contains("sleeps"));
        }

        #[tokio::test]
        async fn test_fail_fast_skips_rest() {
            let mut suite = TestSuite::new("ff");
            suite.add_test(
                TestCase::new("broken").with_step(Step::Click(Selector::css("#missing"))),
            );
            suite.add_test(toggle_test());
            let results = fast_harness()
                .with_fail_fast()
                .run(&suite, &mut toggle_page())
                .await;
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.skipped_count(), 1);
            assert!(!results.all_passed());
        }

        #[tokio::test]
        async fn test_without_fail_fast_runs_all() {
            let mut suite = TestSuite::new("all");
            suite.add_test(
                TestCase::new("broken").with_step(Step::Click(Selector::css("#missing"))),
            );
            suite.add_test(toggle_test());
            let results = fast_harness().run(&suite, &mut toggle_page()).await;
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.passed_count(), 1);
        }

        #[tokio::test]
        async fn test_setup_failure_fails_every_test() {
            let mut suite =
                TestSuite::new("down").with_before_all(Step::navigate("http://localhost:8080/"));
            suite.add_test(toggle_test());
            suite.add_test(toggle_test());
            let mut driver = toggle_page().unreachable();
            let results = fast_harness().run(&suite, &mut driver).await;
            assert!(results.setup_error.is_some());
            assert_eq!(results.failed_count(), 2);
            assert!(results.results[0]
                .error
                .as_deref()
                .unwrap()
                .contains("before_all failed"));
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test]
        async fn test_setup_failure_keeps_cause() {
            let mut suite = TestSuite::new("setup cardinality")
                .with_before_all(Step::Click(Selector::css("button")));
            suite.add_test(toggle_test());
            let mut driver = MockDriver::new()
                .with_element(MockElement::new("a", "button"))
                .with_element(MockElement::new("b", "button"));
            let results = fast_harness().run(&suite, &mut driver).await;

            let failure = &results.results[0];
            let message = failure.error.as_deref().unwrap();
            assert!(message.starts_with("before_all failed: Expected exactly one element"));
            assert!(!message.contains("Page error"));
            assert_eq!(failure.failure_kind, Some(FailureKind::Cardinality));
        }

        #[tokio::test]
        async fn test_filter_selects_tests() {
            let mut suite = TestSuite::new("filtered");
            suite.add_test(toggle_test());
            suite.add_test(TestCase::new("other").with_step(Step::Click(Selector::css("#x"))));
            let mut harness = fast_harness();
            harness.filter = Some("greeting".to_string());
            let results = harness.run(&suite, &mut toggle_page()).await;
            assert_eq!(results.total(), 1);
            assert!(results.all_passed());
        }

        #[tokio::test]
        async fn test_failure_screenshot_written() {
            let dir = tempfile::tempdir().unwrap();
            let mut suite = TestSuite::new("shots");
            suite.add_test(
                TestCase::new("no such thing").with_step(Step::Click(Selector::css("#missing"))),
            );
            let mut harness = fast_harness();
            harness.screenshot_dir = Some(dir.path().join("shots"));
            let results = harness.run(&suite, &mut MockDriver::new()).await;

            let shot = results.results[0].screenshot.clone().unwrap();
            assert_eq!(shot, dir.path().join("shots").join("no_such_thing.png"));
            assert!(std::fs::read(shot).unwrap().starts_with(&[0x89, b'P']));
        }

        #[tokio::test]
        async fn test_results_serialize() {
            let mut suite = TestSuite::new("json");
            suite.add_test(toggle_test());
            let results = fast_harness().run(&suite, &mut toggle_page()).await;
            let json = serde_json::to_value(&results).unwrap();
            assert_eq!(json["results"][0]["status"], "passed");
            assert_eq!(json["suite_name"], "json");
        }
    }
}
