//! PageDriver - abstract page automation seam.
//!
//! Everything above this module (waiting, strict lookup, expectations, the
//! suite harness) talks to a page only through [`PageDriver`]. Two
//! implementations exist:
//!
//! - `ChromiumDriver` (feature `browser`) drives a real Chromium over CDP
//! - [`MockDriver`] keeps an in-memory DOM for unit tests and dry runs

mod mock;

pub use mock::{MockDriver, MockElement};

use crate::result::ProbeResult;
use crate::selector::Selector;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A point in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box for an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box has no area at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }
}

/// Snapshot of one element matched by a selector.
///
/// Handles are values, not live references: `index` is the element's
/// position among the selector's matches at query time, and drivers resolve
/// it again when the handle is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Selector that produced this handle
    pub selector: Selector,
    /// Position among the selector's matches
    pub index: usize,
    /// Lower-case tag name
    pub tag_name: String,
    /// Text content
    pub text_content: String,
    /// Whether the element is rendered and visible
    pub visible: bool,
    /// Bounding box at query time
    pub bounding_box: Option<BoundingBox>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(selector: Selector, index: usize, tag_name: impl Into<String>) -> Self {
        Self {
            selector,
            index,
            tag_name: tag_name.into(),
            text_content: String::new(),
            visible: false,
            bounding_box: None,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// Whether the element's text contains `needle`
    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.text_content.contains(needle)
    }
}

/// Raw per-element record returned by [`Selector::to_snapshot_query`]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ElementSnapshot {
    pub tag: String,
    pub text: String,
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
impl ElementSnapshot {
    pub(crate) fn into_handle(self, selector: &Selector, index: usize) -> ElementHandle {
        ElementHandle::new(selector.clone(), index, self.tag)
            .with_text(self.text)
            .with_visible(self.visible)
            .with_bounding_box(BoundingBox::new(self.x, self.y, self.width, self.height))
    }
}

/// Abstract page automation.
///
/// One driver owns one page for the lifetime of a suite run.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load event
    async fn navigate(&mut self, url: &str) -> ProbeResult<()>;

    /// Snapshot every element currently matching `selector`
    async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>>;

    /// Click the element behind `element`
    async fn click(&mut self, element: &ElementHandle) -> ProbeResult<()>;

    /// Evaluate a JavaScript expression in page context
    async fn evaluate(&self, expression: &str) -> ProbeResult<serde_json::Value>;

    /// Get current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Capture a PNG screenshot of the viewport
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;

    /// Close the page and its browser
    async fn close(&mut self) -> ProbeResult<()>;
}
