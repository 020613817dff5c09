//! Strict element lookup and page expectations.
//!
//! Lookups auto-wait and are strict: a selector that resolves to more than one
//! element is a failure, never "take the first one".

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::driver::{ElementHandle, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::selector::Selector;
use crate::wait::{wait_for, wait_until, WaitOptions};

/// Resolve `selector` to exactly one element.
///
/// Waits for the query to resolve, fetches every match, and fails unless
/// there is exactly one.
pub async fn get_one<D>(
    driver: &D,
    selector: &Selector,
    options: WaitOptions,
) -> ProbeResult<ElementHandle>
where
    D: PageDriver + ?Sized,
{
    wait_for(driver, selector, options).await?;
    let elements = driver.query_all(selector).await?;
    expect_single(selector, elements)
}

fn expect_single(selector: &Selector, mut elements: Vec<ElementHandle>) -> ProbeResult<ElementHandle> {
    match elements.len() {
        1 => elements.pop().ok_or_else(|| ProbeError::NoMatch {
            selector: selector.to_string(),
        }),
        0 => Err(ProbeError::NoMatch {
            selector: selector.to_string(),
        }),
        count => Err(ProbeError::MultipleMatches {
            selector: selector.to_string(),
            count,
        }),
    }
}

/// An assertion about the page, made through a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Exactly one element matches and it can be clicked; click it
    Click {
        /// Element to click
        selector: Selector,
    },
    /// Exactly one element matches, containing `text` and visible if asked
    MatchElement {
        /// Base selector
        selector: Selector,
        /// Substring the element's text must contain
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Whether the element must be visible
        #[serde(default)]
        visible: bool,
    },
}

impl Expectation {
    /// Expect a clickable element and click it
    #[must_use]
    pub const fn click(selector: Selector) -> Self {
        Self::Click { selector }
    }

    /// Expect a matching element
    #[must_use]
    pub const fn match_element(selector: Selector) -> Self {
        Self::MatchElement {
            selector,
            text: None,
            visible: false,
        }
    }

    /// Require the matched element's text to contain `text`
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        match self {
            Self::MatchElement {
                selector, visible, ..
            } => Self::MatchElement {
                selector,
                text: Some(text.into()),
                visible,
            },
            other @ Self::Click { .. } => other,
        }
    }

    /// Require the matched element to be visible
    #[must_use]
    pub fn visible(self) -> Self {
        match self {
            Self::MatchElement { selector, text, .. } => Self::MatchElement {
                selector,
                text,
                visible: true,
            },
            other @ Self::Click { .. } => other,
        }
    }

    /// Selector this expectation is about
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        match self {
            Self::Click { selector } | Self::MatchElement { selector, .. } => selector,
        }
    }

    /// Run the expectation, returning the element it settled on
    pub async fn evaluate<D>(&self, driver: &mut D, options: WaitOptions) -> ProbeResult<ElementHandle>
    where
        D: PageDriver + ?Sized,
    {
        match self {
            Self::Click { selector } => {
                let target = {
                    let page: &D = driver;
                    let candidates = wait_until(&self.to_string(), options, move || async move {
                        let found = page.query_all(selector).await?;
                        Ok(found.iter().any(|el| el.visible).then_some(found))
                    })
                    .await?;
                    expect_single(selector, candidates)?
                };
                debug!(%selector, "clicking");
                driver.click(&target).await?;
                Ok(target)
            }
            Self::MatchElement {
                selector,
                text,
                visible,
            } => {
                let page: &D = driver;
                let text = text.as_deref();
                let visible = *visible;
                let candidates = wait_until(&self.to_string(), options, move || async move {
                    let found: Vec<ElementHandle> = page
                        .query_all(selector)
                        .await?
                        .into_iter()
                        .filter(|el| text.map_or(true, |t| el.contains_text(t)))
                        .collect();
                    let satisfied = found.iter().any(|el| el.visible || !visible);
                    Ok(satisfied.then_some(found))
                })
                .await?;
                let element = expect_single(selector, candidates)?;
                debug!(%selector, "element matched");
                Ok(element)
            }
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click { selector } => write!(f, "click {selector}"),
            Self::MatchElement {
                selector,
                text,
                visible,
            } => {
                write!(f, "element {selector}")?;
                if let Some(text) = text {
                    write!(f, " containing {text:?}")?;
                }
                if *visible {
                    write!(f, " (visible)")?;
                }
                Ok(())
            }
        }
    }
}
