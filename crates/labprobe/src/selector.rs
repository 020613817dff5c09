//! Element selectors and the page-side queries they compile to.
//!
//! A selector is either an XPath ("path query"), a CSS selector, or a CSS
//! selector narrowed by text content. The browser driver never asks the page
//! for "the first match": it always snapshots *every* match so callers can
//! enforce that exactly one element was found.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// XPath expression, e.g. `//h2[contains(., "Datasets")]`
    #[serde(rename = "xpath")]
    XPath(String),
    /// CSS selector, e.g. `[title="Data Explorer"]`
    Css(String),
    /// CSS selector filtered to elements whose text contains `text`
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create an XPath selector
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Narrow a CSS selector by text content.
    ///
    /// XPath selectors are returned unchanged; express text predicates in the
    /// path itself (`[contains(., "...")]`).
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        match self {
            Self::Css(css) | Self::CssWithText { css, .. } => Self::CssWithText {
                css,
                text: text.into(),
            },
            other @ Self::XPath(_) => other,
        }
    }

    /// JavaScript expression evaluating to an `Array` of every matching element
    #[must_use]
    pub fn to_list_expr(&self) -> String {
        match self {
            Self::XPath(path) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) {{ out.push(r.snapshotItem(i)); }} \
                 return out; }})()",
                js_string(path)
            ),
            Self::Css(css) => format!("Array.from(document.querySelectorAll({}))", js_string(css)),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => (el.textContent || '').includes({}))",
                js_string(css),
                js_string(text)
            ),
        }
    }

    /// Query counting the matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_list_expr())
    }

    /// Query returning one JSON record per match: tag, text, visibility and box.
    ///
    /// Visibility mirrors puppeteer: the element must not be `visibility:
    /// hidden` or `display: none` and must have a non-empty bounding box.
    #[must_use]
    pub fn to_snapshot_query(&self) -> String {
        format!(
            "{}.map(el => {{ const r = el.getBoundingClientRect(); \
             const s = window.getComputedStyle(el); \
             return {{ tag: el.tagName.toLowerCase(), text: el.textContent || '', \
             visible: s.visibility !== 'hidden' && s.display !== 'none' && (r.width > 0 || r.height > 0), \
             x: r.x, y: r.y, width: r.width, height: r.height }}; }})",
            self.to_list_expr()
        )
    }

    /// Query scrolling the `index`-th match into view and returning its centre
    #[must_use]
    pub fn to_scroll_center_query(&self, index: usize) -> String {
        format!(
            "(() => {{ const el = {}[{index}]; if (!el) {{ return null; }} \
             el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.x + r.width / 2, y: r.y + r.height / 2 }}; }})()",
            self.to_list_expr()
        )
    }
}

/// JSON string literal, which is also a valid JavaScript string literal
fn js_string(raw: &str) -> String {
    serde_json::Value::from(raw).to_string()
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(path) => write!(f, "xpath={path}"),
            Self::Css(css) => write!(f, "css={css}"),
            Self::CssWithText { css, text } => write!(f, "css={css} text={text:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod construction_tests {
        use super::*;

        #[test]
        fn test_with_text_on_css() {
            let sel = Selector::css(".jl-explorer-heading").with_text("Datasets");
            assert_eq!(
                sel,
                Selector::CssWithText {
                    css: ".jl-explorer-heading".to_string(),
                    text: "Datasets".to_string(),
                }
            );
        }

        #[test]
        fn test_with_text_replaces_previous_filter() {
            let sel = Selector::css("h2").with_text("a").with_text("b");
            assert!(matches!(sel, Selector::CssWithText { ref text, .. } if text == "b"));
        }

        #[test]
        fn test_with_text_keeps_xpath() {
            let sel = Selector::xpath("//h2").with_text("Datasets");
            assert_eq!(sel, Selector::xpath("//h2"));
        }

        #[test]
        fn test_display() {
            assert_eq!(Selector::xpath("//h2").to_string(), "xpath=//h2");
            assert_eq!(
                Selector::css("a").with_text("x").to_string(),
                "css=a text=\"x\""
            );
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_xpath_uses_snapshot() {
            let query = Selector::xpath("//div[@title='Data Browser']").to_list_expr();
            assert!(query.contains("document.evaluate"));
            assert!(query.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
            assert!(query.contains("Data Browser"));
        }

        #[test]
        fn test_css_quotes_are_escaped() {
            let query = Selector::css(r#"[title="Data Explorer"]"#).to_list_expr();
            assert!(query.contains(r#"querySelectorAll("[title=\"Data Explorer\"]")"#));
        }

        #[test]
        fn test_control_characters_use_json_escapes() {
            let query = Selector::css("a").with_text("\u{0}1\u{1f}").to_list_expr();
            assert!(query.contains(r#".includes("\u00001\u001f")"#), "{query}");
            assert!(!query.contains(r"\0"));
            assert!(!query.contains(r"\u{"));
        }

        #[test]
        fn test_css_with_text_filters() {
            let query = Selector::css(".jl-dr-browser")
                .with_text("Follow active?")
                .to_list_expr();
            assert!(query.contains(".filter("));
            assert!(query.contains("Follow active?"));
        }

        #[test]
        fn test_count_query() {
            let query = Selector::css("li").to_count_query();
            assert!(query.ends_with(".length"));
        }

        #[test]
        fn test_snapshot_reports_visibility() {
            let query = Selector::css("h2").to_snapshot_query();
            assert!(query.contains("getBoundingClientRect"));
            assert!(query.contains("visibility !== 'hidden'"));
            assert!(query.contains("display !== 'none'"));
        }

        #[test]
        fn test_scroll_center_indexes_match() {
            let query = Selector::css("button").to_scroll_center_query(2);
            assert!(query.contains("[2]"));
            assert!(query.contains("scrollIntoView"));
        }
    }

    mod serde_tests {
        use super::*;

        use serde_yaml_ng::with::singleton_map_recursive;

        fn from_yaml(raw: &str) -> Selector {
            singleton_map_recursive::deserialize(serde_yaml_ng::Deserializer::from_str(raw))
                .unwrap()
        }

        #[test]
        fn test_yaml_forms() {
            let css = from_yaml("css: '[title=\"Data Browser\"]'");
            assert_eq!(css, Selector::css(r#"[title="Data Browser"]"#));

            let xpath = from_yaml("xpath: //h2");
            assert_eq!(xpath, Selector::xpath("//h2"));

            let filtered = from_yaml("css_with_text: { css: h2, text: Datasets }");
            assert_eq!(filtered, Selector::css("h2").with_text("Datasets"));
        }
    }
}
