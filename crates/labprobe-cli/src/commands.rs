//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use labprobe::{Settle, SuiteConfig};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// labprobe: browser-driven smoke tests for JupyterLab extensions
#[derive(Parser, Debug)]
#[command(name = "labprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log events as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the smoke suite against a JupyterLab server
    Test(TestArgs),

    /// List the tests a suite contains
    List(ListArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the test command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct TestArgs {
    /// Configuration file (YAML)
    #[arg(short, long, env = "LABPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suite file (YAML); the built-in JupyterLab suite when omitted
    #[arg(short, long)]
    pub suite: Option<PathBuf>,

    /// JupyterLab URL to load before the tests
    #[arg(short, long)]
    pub url: Option<String>,

    /// Only run tests whose name contains this
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Per-test timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Settle for a fixed time after navigation instead of polling for readiness
    #[arg(long, conflicts_with_all = ["ready_expr", "no_settle"])]
    pub settle_ms: Option<u64>,

    /// JavaScript readiness predicate polled after navigation
    #[arg(long, conflicts_with = "no_settle")]
    pub ready_expr: Option<String>,

    /// Do not wait after navigation
    #[arg(long)]
    pub no_settle: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Path to the chromium binary
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Stop after the first failing test
    #[arg(long)]
    pub fail_fast: bool,

    /// Write a screenshot here for every failing test
    #[arg(long)]
    pub screenshot_dir: Option<PathBuf>,

    /// Result format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Page driver
    #[arg(long, value_enum, default_value = "chromium")]
    pub driver: DriverArg,
}

impl TestArgs {
    /// Layer the command-line flags over `config`
    #[must_use]
    pub fn apply(&self, mut config: SuiteConfig) -> SuiteConfig {
        if let Some(ref url) = self.url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(ref filter) = self.filter {
            config.filter = Some(filter.clone());
        }
        if self.no_settle {
            config.settle = Settle::None;
        } else if let Some(ms) = self.settle_ms {
            config.settle = Settle::Fixed { ms };
        } else if let Some(ref expr) = self.ready_expr {
            config.settle = Settle::ready(expr.clone());
        }
        if self.fail_fast {
            config.fail_fast = true;
        }
        if let Some(ref dir) = self.screenshot_dir {
            config.screenshot_dir = Some(dir.clone());
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(ref path) = self.chromium_path {
            config.browser.chromium_path = Some(path.clone());
        }
        if self.no_sandbox {
            config.browser.sandbox = false;
        }
        config
    }
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Suite file (YAML); the built-in JupyterLab suite when omitted
    #[arg(short, long)]
    pub suite: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration file (YAML) to load before environment overrides
    #[arg(short, long, env = "LABPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print built-in defaults, ignoring files and environment
    #[arg(long)]
    pub defaults: bool,
}

/// Page driver choice
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverArg {
    /// Headless chromium over the `DevTools` protocol
    #[default]
    Chromium,
    /// In-memory lab fixture, no browser or server needed
    Mock,
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
