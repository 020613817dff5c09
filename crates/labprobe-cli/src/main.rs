//! labprobe: smoke-test a running JupyterLab from the command line
//!
//! ## Usage
//!
//! ```bash
//! labprobe test                                   # built-in suite, headless chromium
//! labprobe test --url http://127.0.0.1:8888/lab?reset --settle-ms 3000
//! labprobe test --suite smoke.yaml --format json  # custom suite, JSON results
//! labprobe list                                   # show the tests
//! labprobe config                                 # effective configuration
//! ```

use clap::Parser;
use labprobe::{lab, SuiteConfig, TestSuite};
use labprobe_cli::{
    suite_listing, Cli, CliConfig, CliError, CliResult, Commands, ConfigArgs, DriverArg, ListArgs,
    OutputFormat, TestArgs, TestRunner, Verbosity,
};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::TestsFailed { .. }) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &CliConfig) -> CliResult<()> {
    match command {
        Commands::Test(args) => run_tests(config, &args).await,
        Commands::List(args) => run_list(&args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into())
        .with_log_json(cli.log_json)
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.log_json {
        builder.json().init();
    } else {
        builder
            .with_ansi(config.color.should_color())
            .init();
    }
}

/// File, then environment, then flags
fn resolve_suite_config(path: Option<&Path>) -> CliResult<SuiteConfig> {
    let config = match path {
        Some(path) => SuiteConfig::load(path)?,
        None => SuiteConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn load_suite(path: Option<&Path>, config: &SuiteConfig) -> CliResult<TestSuite> {
    match path {
        Some(path) => Ok(TestSuite::load(path)?),
        None => Ok(lab::jupyterlab_suite(config)),
    }
}

async fn run_tests(config: &CliConfig, args: &TestArgs) -> CliResult<()> {
    let suite_config = args.apply(resolve_suite_config(args.config.as_deref())?);
    suite_config.validate()?;
    let suite = load_suite(args.suite.as_deref(), &suite_config)?;

    let mut runner = TestRunner::new(config, args.format);
    let results = match args.driver {
        DriverArg::Mock => {
            let mut driver = lab::fixture_driver();
            runner.run(&suite, &suite_config, &mut driver).await
        }
        DriverArg::Chromium => run_chromium(&mut runner, &suite, &suite_config).await?,
    };

    runner.report(&results)?;
    TestRunner::outcome(&results)
}

#[cfg(feature = "browser")]
async fn run_chromium(
    runner: &mut TestRunner,
    suite: &TestSuite,
    suite_config: &SuiteConfig,
) -> CliResult<labprobe::SuiteResults> {
    use labprobe::{ChromiumDriver, PageDriver};

    let mut driver = ChromiumDriver::launch(suite_config.browser.clone()).await?;
    let results = runner.run(suite, suite_config, &mut driver).await;
    if let Err(e) = driver.close().await {
        tracing::warn!(error = %e, "failed to close browser");
    }
    Ok(results)
}

#[cfg(not(feature = "browser"))]
async fn run_chromium(
    _runner: &mut TestRunner,
    _suite: &TestSuite,
    _suite_config: &SuiteConfig,
) -> CliResult<labprobe::SuiteResults> {
    Err(CliError::FeatureDisabled { feature: "browser" })
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let suite = load_suite(args.suite.as_deref(), &SuiteConfig::default())?;
    match args.format {
        OutputFormat::Text => print!("{}", suite_listing(&suite, None)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&suite)?),
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = if args.defaults {
        SuiteConfig::default()
    } else {
        resolve_suite_config(args.config.as_deref())?
    };
    print!("{}", serde_yaml_ng::to_string(&config)?);
    Ok(())
}
