//! Locator expressions and ordered candidate lists.
//!
//! A [`Selector`] is one way of finding an element, in any of the dialects
//! the page objects use (CSS, CSS filtered by text, role + accessible name,
//! raw attribute match, XPath). A [`CandidateSelector`] is the ordered,
//! non-empty list of selectors for one logical element ("the username
//! input"); earlier entries are preferred and later ones are fallbacks for
//! markup drift between ERP versions.
//!
//! Selectors render to JavaScript array expressions so any engine that can
//! evaluate script can host them, and to a stable display string that is
//! used in diagnostics and as the key of the scripted mock DOM.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::result::{SondeoError, SondeoResult};

/// Default per-candidate wait (2 seconds)
pub const DEFAULT_CANDIDATE_TIMEOUT_MS: u64 = 2000;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., `input[name="username"]`)
    Css {
        /// The CSS expression
        css: String,
    },
    /// CSS selector filtered by contained text (Playwright `:has-text`)
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text the element must contain
        text: String,
    },
    /// Element that directly owns the given text
    Text {
        /// Text to match
        text: String,
    },
    /// ARIA role with optional accessible name
    Role {
        /// Role name (button, link, textbox, ...)
        role: String,
        /// Accessible name filter
        name: Option<String>,
    },
    /// Exact attribute match, independent of CSS quoting rules
    Attribute {
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
    /// XPath expression
    XPath {
        /// The XPath expression
        xpath: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            css: selector.into(),
        }
    }

    /// Create a CSS selector filtered by text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.map(str::to_string),
        }
    }

    /// Create an attribute selector
    #[must_use]
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::XPath {
            xpath: xpath.into(),
        }
    }

    /// Parse the string forms used by the page objects.
    ///
    /// - `xpath=...` or anything starting with `//` is XPath
    /// - `text=...` is a text selector
    /// - `role=button` / `role=button[name="Save"]` is a role selector
    /// - `attr:name="value"` is an attribute selector
    /// - `css:has-text("...")` is CSS filtered by text
    /// - anything else is CSS
    #[must_use]
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if let Some(xpath) = expr.strip_prefix("xpath=") {
            return Self::xpath(xpath);
        }
        if expr.starts_with("//") {
            return Self::xpath(expr);
        }
        if let Some(text) = expr.strip_prefix("text=") {
            return Self::text(unquote(text));
        }
        if let Some(rest) = expr.strip_prefix("role=") {
            return parse_role(rest);
        }
        if let Some(rest) = expr.strip_prefix("attr:") {
            if let Some((name, value)) = rest.split_once('=') {
                return Self::attribute(name.trim(), unquote(value.trim()));
            }
        }
        if let Some(idx) = expr.rfind(":has-text(") {
            if expr.ends_with(')') {
                let css = &expr[..idx];
                let inner = &expr[idx + ":has-text(".len()..expr.len() - 1];
                return Self::css_with_text(css, unquote(inner));
            }
        }
        Self::css(expr)
    }

    /// JavaScript expression evaluating to an array of all matching elements
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css { css } => format!("Array.from(document.querySelectorAll({css:?}))"),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({css:?})).filter(el => \
                 (el.textContent || '').includes({text:?}) || (el.value || '').includes({text:?}))"
            ),
            Self::Text { text } => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => \
                 Array.from(el.childNodes).some(n => n.nodeType === 3 && n.textContent.includes({text:?})))"
            ),
            Self::Role { role, name } => {
                let base = format!(
                    "Array.from(document.querySelectorAll({:?}))",
                    implicit_role_css(role)
                );
                match name {
                    Some(n) => format!(
                        "{base}.filter(el => [el.getAttribute('aria-label'), el.getAttribute('title'), \
                         el.value, el.textContent].some(v => (v || '').trim() === {n:?}))"
                    ),
                    None => base,
                }
            }
            Self::Attribute { name, value } => format!(
                "Array.from(document.querySelectorAll('*')).filter(el => el.getAttribute({name:?}) === {value:?})"
            ),
            Self::XPath { xpath } => format!(
                "(() => {{ const r = document.evaluate({xpath:?}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()"
            ),
        }
    }

    /// JavaScript expression evaluating to the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("({}[0] || null)", self.to_all_query())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { css } => write!(f, "{css}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text(\"{text}\")"),
            Self::Text { text } => write!(f, "text={text}"),
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name=\"{name}\"]"),
            Self::Attribute { name, value } => write!(f, "attr:{name}=\"{value}\""),
            Self::XPath { xpath } => write!(f, "xpath={xpath}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(expr: &str) -> Self {
        Self::parse(expr)
    }
}

impl From<String> for Selector {
    fn from(expr: String) -> Self {
        Self::parse(&expr)
    }
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn parse_role(rest: &str) -> Selector {
    match rest.split_once('[') {
        Some((role, filter)) => {
            let filter = filter.trim_end_matches(']');
            let name = filter
                .strip_prefix("name=")
                .map(unquote)
                .filter(|n| !n.is_empty());
            Selector::Role {
                role: role.trim().to_string(),
                name,
            }
        }
        None => Selector::role(rest.trim(), None),
    }
}

/// CSS covering explicit and the common implicit ARIA roles
fn implicit_role_css(role: &str) -> String {
    let implicit = match role {
        "button" => "button, input[type=submit], input[type=button], input[type=reset]",
        "link" => "a[href]",
        "textbox" => "input:not([type]), input[type=text], input[type=email], input[type=password], textarea",
        "checkbox" => "input[type=checkbox]",
        "radio" => "input[type=radio]",
        "combobox" => "select",
        "heading" => "h1, h2, h3, h4, h5, h6",
        _ => "",
    };
    if implicit.is_empty() {
        format!("[role={role}]")
    } else {
        format!("{implicit}, [role={role}]")
    }
}

/// How present an element must be for a candidate to win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Present in the DOM
    Attached,
    /// Present and rendered
    #[default]
    Visible,
    /// Rendered and not disabled
    Interactable,
}

impl Visibility {
    /// Whether a probe result satisfies this requirement
    #[must_use]
    pub const fn is_met(self, probe: &ElementProbe) -> bool {
        if probe.count == 0 {
            return false;
        }
        match self {
            Self::Attached => true,
            Self::Visible => probe.visible,
            Self::Interactable => probe.visible && probe.enabled,
        }
    }
}

/// State of the first element matching a selector at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementProbe {
    /// Number of matching elements
    pub count: usize,
    /// First match is rendered
    pub visible: bool,
    /// First match is not disabled
    pub enabled: bool,
}

impl ElementProbe {
    /// No element matched
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            count: 0,
            visible: false,
            enabled: false,
        }
    }
}

/// Ordered fallback list for one logical UI element.
///
/// Non-empty by construction: build it with [`CandidateSelector::first`] and
/// chain fallbacks with [`CandidateSelector::or`], or use
/// [`CandidateSelector::try_from_list`] for lists that come from data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSelector {
    name: String,
    candidates: Vec<Selector>,
    visibility: Visibility,
    timeout: Option<Duration>,
}

impl CandidateSelector {
    /// Start a candidate list with its preferred selector
    #[must_use]
    pub fn first(name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Self {
            name: name.into(),
            candidates: vec![selector.into()],
            visibility: Visibility::default(),
            timeout: None,
        }
    }

    /// Append a fallback selector
    #[must_use]
    pub fn or(mut self, selector: impl Into<Selector>) -> Self {
        self.candidates.push(selector.into());
        self
    }

    /// Build from a list, rejecting an empty one
    pub fn try_from_list<I, S>(name: impl Into<String>, selectors: I) -> SondeoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        let name = name.into();
        let candidates: Vec<Selector> = selectors.into_iter().map(Into::into).collect();
        if candidates.is_empty() {
            return Err(SondeoError::InvalidSelector {
                message: format!("candidate list for '{name}' is empty"),
            });
        }
        Ok(Self {
            name,
            candidates,
            visibility: Visibility::default(),
            timeout: None,
        })
    }

    /// Set the visibility requirement
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the per-candidate wait
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Logical element name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidates in preference order
    #[must_use]
    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }

    /// Visibility requirement
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Per-candidate wait, falling back to `default`
    #[must_use]
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Upper bound for a full resolution that finds nothing
    #[must_use]
    pub fn worst_case(&self, default: Duration) -> Duration {
        self.timeout_or(default) * self.candidates.len() as u32
    }

    /// Display strings of every candidate, for error messages
    #[must_use]
    pub fn described(&self) -> Vec<String> {
        self.candidates.iter().map(ToString::to_string).collect()
    }
}
