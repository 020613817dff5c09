//! The built-in JupyterLab smoke suite.
//!
//! Two tests against the data explorer extension: opening the "Data
//! Explorer" tab shows the datasets heading, opening the "Data Browser" tab
//! shows the browser panel.

use crate::config::SuiteConfig;
use crate::driver::{MockDriver, MockElement};
use crate::harness::{Step, TestCase, TestSuite};
use crate::selector::Selector;

/// Lab URL; `reset` discards any saved workspace layout
pub const DEFAULT_URL: &str = "http://localhost:8080/lab?reset";

/// Truthy once the lab shell is attached and the splash screen is gone
pub const READY_EXPRESSION: &str = "document.querySelector('.jp-LabShell') !== null \
     && document.getElementById('jupyterlab-splash') === null";

/// Side-bar tab opening the data explorer
pub const DATA_EXPLORER_TAB: &str = r#"[title="Data Explorer"]"#;

/// Heading rendered by the data explorer panel
pub const EXPLORER_HEADING: &str = ".jl-explorer-heading";

/// Text the explorer heading must contain
pub const EXPLORER_HEADING_TEXT: &str = "Datasets";

/// Side-bar tab opening the data browser
pub const DATA_BROWSER_TAB: &str = r#"[title="Data Browser"]"#;

/// Root of the data browser panel
pub const BROWSER_PANEL: &str = ".jl-dr-browser";

/// Text the browser panel must contain
pub const BROWSER_PANEL_TEXT: &str = "Follow active?";

/// Suite name
pub const SUITE_NAME: &str = "JupyterLab";

/// Build the JupyterLab suite for `config`
#[must_use]
pub fn jupyterlab_suite(config: &SuiteConfig) -> TestSuite {
    let mut suite = TestSuite::new(SUITE_NAME)
        .with_before_all(Step::navigate(config.base_url.clone()))
        .with_before_all(Step::Settle(config.settle.clone()));
    suite.add_test(tab_test(
        "should show a 'Data Explorer' tab",
        DATA_EXPLORER_TAB,
        EXPLORER_HEADING,
        EXPLORER_HEADING_TEXT,
    ));
    suite.add_test(tab_test(
        "should show a 'Data Browser' tab",
        DATA_BROWSER_TAB,
        BROWSER_PANEL,
        BROWSER_PANEL_TEXT,
    ));
    suite
}

fn tab_test(name: &str, tab: &str, panel: &str, text: &str) -> TestCase {
    TestCase::new(name)
        .with_expected_assertions(2)
        .with_step(Step::Click(Selector::css(tab)))
        .with_step(Step::match_visible(Selector::css(panel), text))
}

/// In-memory lab page with both side-bar tabs and their (initially hidden)
/// panels; clicking a tab shows its panel and hides the other one
#[must_use]
pub fn fixture_driver() -> MockDriver {
    MockDriver::new()
        .with_element(MockElement::new("shell", "div").with_class("jp-LabShell"))
        .with_element(
            MockElement::new("explorer-tab", "li")
                .with_class("lm-TabBar-tab")
                .with_attr("title", "Data Explorer")
                .reveals("explorer-heading")
                .hides("browser-panel"),
        )
        .with_element(
            MockElement::new("browser-tab", "li")
                .with_class("lm-TabBar-tab")
                .with_attr("title", "Data Browser")
                .reveals("browser-panel")
                .hides("explorer-heading"),
        )
        .with_element(
            MockElement::new("explorer-heading", "h2")
                .with_class("jl-explorer-heading")
                .with_text("Datasets")
                .hidden(),
        )
        .with_element(
            MockElement::new("browser-panel", "div")
                .with_class("jl-dr-browser")
                .with_text("Follow active? Name Type")
                .hidden(),
        )
}
