//! In-memory page for unit tests and dry runs.
//!
//! The mock DOM is flat: every element carries its own tag, id, classes,
//! attributes and text. CSS support covers compound selectors (`tag`, `#id`,
//! `.class`, `[attr]`, `[attr="v"]`, comma lists). XPath support covers
//! `//tag` or `//*` followed by predicates over attributes and text.

use super::{BoundingBox, ElementHandle, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::selector::Selector;
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::atomic::{AtomicUsize, Ordering};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// An element of the mock DOM
#[derive(Debug, Clone)]
pub struct MockElement {
    key: String,
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    visible: bool,
    appears_after: usize,
    reveals: Vec<String>,
    hides: Vec<String>,
}

impl MockElement {
    /// Create a visible element; `key` names it for reveal/hide rules
    #[must_use]
    pub fn new(key: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            visible: true,
            appears_after: 0,
            reveals: Vec::new(),
            hides: Vec::new(),
        }
    }

    /// Set the id attribute
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Start hidden (present in the DOM, not visible)
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Keep the element out of the first `queries` queries
    #[must_use]
    pub const fn appears_after(mut self, queries: usize) -> Self {
        self.appears_after = queries;
        self
    }

    /// Clicking this element makes `key` present and visible
    #[must_use]
    pub fn reveals(mut self, key: impl Into<String>) -> Self {
        self.reveals.push(key.into());
        self
    }

    /// Clicking this element hides `key`
    #[must_use]
    pub fn hides(mut self, key: impl Into<String>) -> Self {
        self.hides.push(key.into());
        self
    }

    /// Element key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the element is currently visible
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    fn attr(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            _ => self.attributes.get(name).cloned(),
        }
    }

    fn to_handle(&self, selector: &Selector, index: usize) -> ElementHandle {
        let handle = ElementHandle::new(selector.clone(), index, self.tag.clone())
            .with_text(self.text.clone())
            .with_visible(self.visible);
        if self.visible {
            handle.with_bounding_box(BoundingBox::new(0.0, 0.0, 120.0, 24.0))
        } else {
            handle
        }
    }
}

/// Mock driver backed by [`MockElement`]s
#[derive(Debug, Default)]
pub struct MockDriver {
    url: String,
    elements: Vec<MockElement>,
    history: Vec<String>,
    queries: AtomicUsize,
    evaluations: AtomicUsize,
    ready_after: Option<usize>,
    failing_evaluations: usize,
    unreachable: bool,
    closed: bool,
}

impl MockDriver {
    /// Create an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// `evaluate` returns `true` from the `calls`-th call on
    #[must_use]
    pub const fn ready_after(mut self, calls: usize) -> Self {
        self.ready_after = Some(calls);
        self
    }

    /// The first `calls` evaluations fail as if the page were reloading
    #[must_use]
    pub const fn evaluate_fails_first(mut self, calls: usize) -> Self {
        self.failing_evaluations = calls;
        self
    }

    /// Every navigation fails as if nothing listens on the port
    #[must_use]
    pub const fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Mutating calls made so far (`navigate:<url>`, `click:<key>`, `close`)
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history.iter().any(|c| c.starts_with(prefix))
    }

    /// Look up an element by key
    #[must_use]
    pub fn element(&self, key: &str) -> Option<&MockElement> {
        self.elements.iter().find(|el| el.key == key)
    }

    /// Number of `evaluate` calls made on an open page
    #[must_use]
    pub fn evaluate_count(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    fn matching<'a>(
        &'a self,
        matcher: &'a Matcher,
        seen: usize,
    ) -> impl Iterator<Item = &'a MockElement> + 'a {
        self.elements
            .iter()
            .filter(move |el| el.appears_after < seen && matcher.matches(el))
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            Err(ProbeError::Page {
                message: "page is closed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        self.history.push(format!("navigate:{url}"));
        if self.unreachable {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        let matcher = Matcher::compile(selector)?;
        let seen = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self
            .matching(&matcher, seen)
            .enumerate()
            .map(|(index, el)| el.to_handle(selector, index))
            .collect())
    }

    async fn click(&mut self, element: &ElementHandle) -> ProbeResult<()> {
        self.ensure_open()?;
        let matcher = Matcher::compile(&element.selector)?;
        let seen = self.queries.load(Ordering::SeqCst);
        let (key, reveals, hides) = {
            let target = self
                .matching(&matcher, seen)
                .nth(element.index)
                .ok_or_else(|| ProbeError::Input {
                    message: format!(
                        "element {} #{} is no longer attached",
                        element.selector, element.index
                    ),
                })?;
            if !target.visible {
                return Err(ProbeError::Input {
                    message: format!("element {} is not visible", element.selector),
                });
            }
            (
                target.key.clone(),
                target.reveals.clone(),
                target.hides.clone(),
            )
        };

        for el in &mut self.elements {
            if hides.contains(&el.key) {
                el.visible = false;
            }
            if reveals.contains(&el.key) {
                el.visible = true;
                el.appears_after = 0;
            }
        }
        self.history.push(format!("click:{key}"));
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> ProbeResult<serde_json::Value> {
        self.ensure_open()?;
        // every expression is treated as the readiness check
        let calls = self.evaluations.fetch_add(1, Ordering::SeqCst) + 1;
        if calls <= self.failing_evaluations {
            return Err(ProbeError::Evaluation {
                message: "Execution context was destroyed".to_string(),
            });
        }
        let ready = self.ready_after.map_or(true, |n| calls >= n);
        Ok(serde_json::Value::Bool(ready))
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.url.clone())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.ensure_open()?;
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.history.push("close".to_string());
        self.closed = true;
        Ok(())
    }
}

// ============================================================================
// Selector matching
// ============================================================================

#[derive(Debug)]
enum Matcher {
    Css {
        alternatives: Vec<Compound>,
        text: Option<String>,
    },
    XPath(XPathQuery),
}

impl Matcher {
    fn compile(selector: &Selector) -> ProbeResult<Self> {
        match selector {
            Selector::Css(css) => Ok(Self::Css {
                alternatives: parse_css(css)?,
                text: None,
            }),
            Selector::CssWithText { css, text } => Ok(Self::Css {
                alternatives: parse_css(css)?,
                text: Some(text.clone()),
            }),
            Selector::XPath(path) => Ok(Self::XPath(XPathQuery::parse(path)?)),
        }
    }

    fn matches(&self, el: &MockElement) -> bool {
        match self {
            Self::Css { alternatives, text } => {
                alternatives.iter().any(|c| c.matches(el))
                    && text.as_deref().map_or(true, |t| el.text.contains(t))
            }
            Self::XPath(query) => query.matches(el),
        }
    }
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, el: &MockElement) -> bool {
        self.tag.as_deref().map_or(true, |t| t == el.tag)
            && self
                .id
                .as_deref()
                .map_or(true, |id| el.id.as_deref() == Some(id))
            && self.classes.iter().all(|c| el.classes.contains(c))
            && self.attrs.iter().all(|(name, value)| match (el.attr(name), value) {
                (Some(actual), Some(expected)) => &actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn parse_css(input: &str) -> ProbeResult<Vec<Compound>> {
    input
        .split(',')
        .map(|part| parse_compound(part.trim()))
        .collect()
}

fn parse_compound(part: &str) -> ProbeResult<Compound> {
    let unsupported =
        || ProbeError::config(format!("unsupported CSS selector in mock DOM: {part:?}"));
    if part.is_empty() {
        return Err(unsupported());
    }

    let mut compound = Compound::default();
    let mut chars = part.chars().peekable();
    match chars.peek() {
        Some('*') => {
            chars.next();
        }
        Some(&c) if is_ident_char(c) => {
            compound.tag = Some(take_ident(&mut chars).to_ascii_lowercase());
        }
        _ => {}
    }

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                let id = take_ident(&mut chars);
                if id.is_empty() {
                    return Err(unsupported());
                }
                compound.id = Some(id);
            }
            '.' => {
                let class = take_ident(&mut chars);
                if class.is_empty() {
                    return Err(unsupported());
                }
                compound.classes.push(class);
            }
            '[' => {
                let name = take_ident(&mut chars);
                if name.is_empty() {
                    return Err(unsupported());
                }
                match chars.next() {
                    Some(']') => compound.attrs.push((name, None)),
                    Some('=') => {
                        let value = match chars.peek() {
                            Some(&q) if q == '"' || q == '\'' => {
                                chars.next();
                                let mut value = String::new();
                                loop {
                                    match chars.next() {
                                        Some(ch) if ch == q => break,
                                        Some(ch) => value.push(ch),
                                        None => return Err(unsupported()),
                                    }
                                }
                                value
                            }
                            _ => take_ident(&mut chars),
                        };
                        if chars.next() != Some(']') {
                            return Err(unsupported());
                        }
                        compound.attrs.push((name, Some(value)));
                    }
                    _ => return Err(unsupported()),
                }
            }
            _ => return Err(unsupported()),
        }
    }
    Ok(compound)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Text,
    Attr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Has(String),
    Equals(Target, String),
    Contains(Target, String),
}

#[derive(Debug)]
struct XPathQuery {
    tag: Option<String>,
    predicates: Vec<Predicate>,
}

impl XPathQuery {
    fn parse(path: &str) -> ProbeResult<Self> {
        let unsupported =
            || ProbeError::config(format!("unsupported XPath in mock DOM: {path:?}"));
        let compile = |re: &str| Regex::new(re).map_err(|e| ProbeError::config(e.to_string()));

        let whole = compile(r"^//(\*|[A-Za-z][\w-]*)((?:\[[^\]]*\])*)$")?;
        let bracket = compile(r"\[([^\]]*)\]")?;
        let contains = compile(
            r#"^contains\(\s*(\.|text\(\)|@[\w-]+)\s*,\s*(?:"([^"]*)"|'([^']*)')\s*\)$"#,
        )?;
        let equals = compile(r#"^(\.|text\(\)|@[\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')$"#)?;
        let has = compile(r"^@([\w-]+)$")?;

        let caps = whole.captures(path.trim()).ok_or_else(unsupported)?;
        let tag = match &caps[1] {
            "*" => None,
            t => Some(t.to_ascii_lowercase()),
        };

        let mut predicates = Vec::new();
        for pred in bracket.captures_iter(caps.get(2).map_or("", |m| m.as_str())) {
            let body = pred[1].trim();
            if let Some(c) = contains.captures(body) {
                predicates.push(Predicate::Contains(target(&c[1]), literal(&c)));
            } else if let Some(c) = equals.captures(body) {
                predicates.push(Predicate::Equals(target(&c[1]), literal(&c)));
            } else if let Some(c) = has.captures(body) {
                predicates.push(Predicate::Has(c[1].to_string()));
            } else {
                return Err(unsupported());
            }
        }
        Ok(Self { tag, predicates })
    }

    fn matches(&self, el: &MockElement) -> bool {
        let resolve = |t: &Target| match t {
            Target::Text => Some(el.text.clone()),
            Target::Attr(name) => el.attr(name),
        };
        self.tag.as_deref().map_or(true, |t| t == el.tag)
            && self.predicates.iter().all(|p| match p {
                Predicate::Has(name) => el.attr(name).is_some(),
                Predicate::Equals(t, v) => resolve(t).as_deref() == Some(v.as_str()),
                Predicate::Contains(t, v) => resolve(t).is_some_and(|s| s.contains(v.as_str())),
            })
    }
}

fn target(raw: &str) -> Target {
    raw.strip_prefix('@')
        .map_or(Target::Text, |name| Target::Attr(name.to_string()))
}

fn literal(caps: &Captures<'_>) -> String {
    caps.get(2)
        .or_else(|| caps.get(3))
        .map_or_else(String::new, |m| m.as_str().to_string())
}
