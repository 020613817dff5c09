//! Test runner: drives a suite through the harness and reports the outcome

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{results_json, OutputFormat, ProgressReporter};
use labprobe::{PageDriver, SuiteConfig, SuiteResults, TestHarness, TestSuite};
use std::time::Duration;
use tracing::info;

/// Test runner for executing labprobe suites
#[derive(Debug)]
pub struct TestRunner {
    format: OutputFormat,
    reporter: ProgressReporter,
}

impl TestRunner {
    /// Create a new test runner
    #[must_use]
    pub fn new(config: &CliConfig, format: OutputFormat) -> Self {
        // JSON goes to stdout; keep stderr to failures only
        let quiet = config.verbosity.is_quiet() || format == OutputFormat::Json;
        let reporter = ProgressReporter::new(config.color.should_color(), quiet);
        Self { format, reporter }
    }

    /// Run `suite` against `driver` and report the results
    pub async fn run<D>(
        &mut self,
        suite: &TestSuite,
        suite_config: &SuiteConfig,
        driver: &mut D,
    ) -> SuiteResults
    where
        D: PageDriver + ?Sized,
    {
        let harness = TestHarness::from_config(suite_config);
        let selected = suite.selected(suite_config.filter.as_deref()).len();
        if selected == 0 {
            self.reporter.warning("No tests match the filter");
        }

        self.reporter.header(&suite.name);
        self.reporter
            .start_spinner(&format!("running {selected} tests against {}", suite_config.base_url));
        let results = harness.run(suite, driver).await;
        self.reporter.finish();

        info!(
            suite = %results.suite_name,
            passed = results.passed_count(),
            failed = results.failed_count(),
            "suite finished"
        );
        results
    }

    /// Print the results in the configured format
    pub fn report(&self, results: &SuiteResults) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => println!("{}", results_json(results)?),
            OutputFormat::Text => {
                if let Some(ref error) = results.setup_error {
                    self.reporter.failure(&format!("before_all: {error}"));
                }
                for result in &results.results {
                    self.reporter.test_result(result);
                }
                self.reporter.summary(
                    results.passed_count(),
                    results.failed_count(),
                    results.skipped_count(),
                    Duration::from_millis(results.duration_ms),
                );
            }
        }
        Ok(())
    }

    /// Map results to the command's outcome
    pub fn outcome(results: &SuiteResults) -> CliResult<()> {
        if results.all_passed() {
            Ok(())
        } else {
            Err(CliError::TestsFailed {
                failed: results.total() - results.passed_count(),
                total: results.total(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ColorChoice;
    use labprobe::{lab, MockDriver, Settle};

    fn quiet_config() -> CliConfig {
        CliConfig::new().with_color(ColorChoice::Never)
    }

    fn fast_suite_config() -> SuiteConfig {
        SuiteConfig::default()
            .with_timeout(500)
            .with_settle(Settle::None)
    }

    #[tokio::test]
    async fn test_runs_lab_suite_on_fixture() {
        let suite_config = fast_suite_config();
        let suite = lab::jupyterlab_suite(&suite_config);
        let mut runner = TestRunner::new(&quiet_config(), OutputFormat::Text);
        let results = runner
            .run(&suite, &suite_config, &mut lab::fixture_driver())
            .await;
        assert_eq!(results.passed_count(), 2);
        runner.report(&results).unwrap();
        TestRunner::outcome(&results).unwrap();
    }

    #[tokio::test]
    async fn test_failures_map_to_error() {
        let suite_config = fast_suite_config().with_timeout(50);
        let suite = lab::jupyterlab_suite(&suite_config);
        let mut runner = TestRunner::new(&quiet_config(), OutputFormat::Json);
        let results = runner
            .run(&suite, &suite_config, &mut MockDriver::new())
            .await;
        let err = TestRunner::outcome(&results).unwrap_err();
        assert!(matches!(err, CliError::TestsFailed { failed: 2, total: 2 }));
    }

    #[tokio::test]
    async fn test_filter_limits_run() {
        let suite_config = fast_suite_config().with_filter("Data Browser");
        let suite = lab::jupyterlab_suite(&suite_config);
        let mut runner = TestRunner::new(&quiet_config(), OutputFormat::Text);
        let results = runner
            .run(&suite, &suite_config, &mut lab::fixture_driver())
            .await;
        assert_eq!(results.total(), 1);
        assert!(results.all_passed());
    }
}
