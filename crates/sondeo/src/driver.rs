//! PageDriver - the automation engine boundary.
//!
//! Everything the resolver, the classifier and the page objects need from a
//! browser goes through [`PageDriver`]: query an element's state, set values,
//! click, read the URL and title, and capture a screenshot. Implementations:
//!
//! - [`crate::browser::ChromiumDriver`] (feature `browser`): Chromium over CDP
//! - [`MockDriver`]: scripted in-memory DOM for unit and scenario tests
//!
//! Driver methods take `&self` so a page object can hold a shared reference
//! while the driver serializes access internally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::locator::{ElementProbe, Selector};
use crate::result::{SondeoError, SondeoResult};

/// How a `<select>` option is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectBy {
    /// Match the visible option text
    #[default]
    Label,
    /// Match the option's `value` attribute
    Value,
}

impl SelectBy {
    /// Pair this mode with a concrete value
    #[must_use]
    pub fn matching(self, value: impl Into<String>) -> OptionMatch {
        match self {
            Self::Label => OptionMatch::Label(value.into()),
            Self::Value => OptionMatch::Value(value.into()),
        }
    }
}

/// A concrete option to select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMatch {
    /// Option whose trimmed text equals this label
    Label(String),
    /// Option whose value attribute equals this value
    Value(String),
}

impl OptionMatch {
    /// The value or label text
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Label(s) | Self::Value(s) => s,
        }
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// When the capture was taken
    pub taken_at: DateTime<Utc>,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            taken_at: Utc::now(),
        }
    }

    /// Check if screenshot is valid (has data)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() && self.width > 0 && self.height > 0
    }
}

/// Browser configuration for driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// User agent string
    pub user_agent: Option<String>,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Chromium executable path override
    pub executable_path: Option<String>,
    /// Chromium sandbox (disable inside containers)
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: None,
            navigation_timeout: Duration::from_secs(30),
            executable_path: None,
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set user agent
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Use a specific Chromium binary
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Run Chromium without its sandbox
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Abstract page driver.
///
/// All selectors act on the first match. Probing never waits; bounded waiting
/// is layered on top in [`crate::wait`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> SondeoResult<()>;

    /// Current state of the first element matching `selector`
    async fn probe(&self, selector: &Selector) -> SondeoResult<ElementProbe>;

    /// Replace the value of an input
    async fn fill(&self, selector: &Selector, value: &str) -> SondeoResult<()>;

    /// Click an element
    async fn click(&self, selector: &Selector) -> SondeoResult<()>;

    /// Choose an option of a `<select>`
    async fn select_option(&self, selector: &Selector, option: &OptionMatch) -> SondeoResult<()>;

    /// Check or uncheck a checkbox or radio
    async fn set_checked(&self, selector: &Selector, checked: bool) -> SondeoResult<()>;

    /// Text content of the first match, `None` when nothing matches
    async fn text_content(&self, selector: &Selector) -> SondeoResult<Option<String>>;

    /// Current page URL
    async fn current_url(&self) -> SondeoResult<String>;

    /// Current document title
    async fn title(&self) -> SondeoResult<String>;

    /// Capture the viewport
    async fn screenshot(&self) -> SondeoResult<Screenshot>;
}

// ============================================================================
// MockDriver
// ============================================================================

/// One element of the scripted DOM
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MockElement {
    /// Rendered
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Number of matches reported by probes
    pub count: usize,
    /// Input value or selected option
    pub value: Option<String>,
    /// Checkbox/radio state
    pub checked: bool,
    /// Text content
    pub text: Option<String>,
    /// Probing raises a script error (malformed expression, detached frame)
    pub broken: bool,
    /// Probing never completes
    pub hangs: bool,
    /// Actions on this element fail with this message
    pub action_error: Option<String>,
    /// Options offered by a select, as (value, label)
    pub options: Vec<(String, String)>,
}

impl MockElement {
    /// A rendered, enabled element
    #[must_use]
    pub fn visible() -> Self {
        Self {
            visible: true,
            enabled: true,
            count: 1,
            ..Self::default()
        }
    }

    /// Present in the DOM but not rendered
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            enabled: true,
            count: 1,
            ..Self::default()
        }
    }

    /// Probing this selector raises
    #[must_use]
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    /// Probing this selector never answers
    #[must_use]
    pub fn hanging() -> Self {
        Self {
            hangs: true,
            ..Self::default()
        }
    }

    /// Rendered but disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set an initial value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Offer select options as (value, label) pairs
    #[must_use]
    pub fn with_options<I, V, L>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        self.options = options
            .into_iter()
            .map(|(v, l)| (v.into(), l.into()))
            .collect();
        self
    }

    /// Fail every action on this element
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.action_error = Some(message.into());
        self
    }
}

/// Page changes applied after a click, optionally delayed
#[derive(Debug, Clone, Default)]
pub struct MockEffect {
    delay: Duration,
    navigate_to: Option<String>,
    title: Option<String>,
    show: Vec<(String, MockElement)>,
    remove: Vec<String>,
    then: Vec<MockEffect>,
}

impl MockEffect {
    /// Create an empty effect
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the effect this long after the click
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change the URL
    #[must_use]
    pub fn navigate_to(mut self, url: impl Into<String>) -> Self {
        self.navigate_to = Some(url.into());
        self
    }

    /// Change the document title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Insert or replace an element
    #[must_use]
    pub fn show(mut self, selector: impl Into<Selector>, element: MockElement) -> Self {
        self.show.push((selector.into().to_string(), element));
        self
    }

    /// Remove an element from the DOM
    #[must_use]
    pub fn remove(mut self, selector: impl Into<Selector>) -> Self {
        self.remove.push(selector.into().to_string());
        self
    }

    /// Chain a further effect, its delay counted from when this one applies
    #[must_use]
    pub fn then(mut self, effect: Self) -> Self {
        self.then.push(effect);
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    title: String,
    elements: HashMap<String, MockElement>,
    on_click: HashMap<String, MockEffect>,
    pending: Vec<(Instant, MockEffect)>,
    probes: Vec<String>,
    call_history: Vec<String>,
    screenshot: Option<Screenshot>,
}

impl MockState {
    fn apply_due(&mut self) {
        let now = Instant::now();
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.pending = later;
        for (_, effect) in due {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: MockEffect) {
        if let Some(url) = effect.navigate_to {
            self.url = url;
        }
        if let Some(title) = effect.title {
            self.title = title;
        }
        for key in effect.remove {
            self.elements.remove(&key);
        }
        for (key, element) in effect.show {
            self.elements.insert(key, element);
        }
        for next in effect.then {
            self.schedule(next);
        }
    }

    fn schedule(&mut self, effect: MockEffect) {
        if effect.delay.is_zero() {
            self.apply(effect);
        } else {
            let at = Instant::now() + effect.delay;
            self.pending.push((at, effect));
        }
    }

    fn element_mut(&mut self, key: &str) -> SondeoResult<&mut MockElement> {
        let element = self
            .elements
            .get_mut(key)
            .filter(|e| e.count > 0)
            .ok_or_else(|| SondeoError::page(format!("no element matches {key}")))?;
        if let Some(message) = &element.action_error {
            return Err(SondeoError::page(message.clone()));
        }
        Ok(element)
    }
}

/// Mock driver for unit and scenario testing.
///
/// Elements are keyed by the display string of their [`Selector`], so
/// `#username` and `Selector::css("#username")` address the same element.
/// Clicks can trigger scripted [`MockEffect`]s; delayed effects are driven by
/// `tokio::time`, which makes them deterministic under a paused clock.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.apply_due();
        guard
    }

    /// Set the starting URL
    #[must_use]
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.state().url = url.into();
        self
    }

    /// Set the starting title
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state().title = title.into();
        self
    }

    /// Add an element to the scripted DOM
    #[must_use]
    pub fn with_element(self, selector: impl Into<Selector>, element: MockElement) -> Self {
        self.set_element(selector, element);
        self
    }

    /// Script what a click on `selector` does
    #[must_use]
    pub fn on_click(self, selector: impl Into<Selector>, effect: MockEffect) -> Self {
        self.state()
            .on_click
            .insert(selector.into().to_string(), effect);
        self
    }

    /// Set mock screenshot
    #[must_use]
    pub fn with_screenshot(self, screenshot: Screenshot) -> Self {
        self.state().screenshot = Some(screenshot);
        self
    }

    /// Insert or replace an element after construction
    pub fn set_element(&self, selector: impl Into<Selector>, element: MockElement) {
        self.state()
            .elements
            .insert(selector.into().to_string(), element);
    }

    /// Remove an element after construction
    pub fn remove_element(&self, selector: impl Into<Selector>) {
        self.state().elements.remove(&selector.into().to_string());
    }

    /// Selectors probed so far, in order
    #[must_use]
    pub fn probed(&self) -> Vec<String> {
        self.state().probes.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state()
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Value held by an element
    #[must_use]
    pub fn value_of(&self, selector: impl Into<Selector>) -> Option<String> {
        self.state()
            .elements
            .get(&selector.into().to_string())
            .and_then(|e| e.value.clone())
    }

    /// Whether an element is checked
    #[must_use]
    pub fn is_checked(&self, selector: impl Into<Selector>) -> bool {
        self.state()
            .elements
            .get(&selector.into().to_string())
            .is_some_and(|e| e.checked)
    }

    fn record(&self, call: String) {
        self.state().call_history.push(call);
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str) -> SondeoResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("goto:{url}"));
        state.url = url.to_string();
        Ok(())
    }

    async fn probe(&self, selector: &Selector) -> SondeoResult<ElementProbe> {
        let key = selector.to_string();
        let element = {
            let mut state = self.state();
            state.probes.push(key.clone());
            state.elements.get(&key).cloned()
        };
        let Some(element) = element else {
            return Ok(ElementProbe::absent());
        };
        if element.hangs {
            std::future::pending::<()>().await;
        }
        if element.broken {
            return Err(SondeoError::script(format!(
                "failed to evaluate selector {key}"
            )));
        }
        Ok(ElementProbe {
            count: element.count,
            visible: element.visible,
            enabled: element.enabled,
        })
    }

    async fn fill(&self, selector: &Selector, value: &str) -> SondeoResult<()> {
        let key = selector.to_string();
        self.record(format!("fill:{key}={value}"));
        let mut state = self.state();
        state.element_mut(&key)?.value = Some(value.to_string());
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> SondeoResult<()> {
        let key = selector.to_string();
        self.record(format!("click:{key}"));
        let mut state = self.state();
        state.element_mut(&key)?;
        if let Some(effect) = state.on_click.get(&key).cloned() {
            state.schedule(effect);
        }
        Ok(())
    }

    async fn select_option(&self, selector: &Selector, option: &OptionMatch) -> SondeoResult<()> {
        let key = selector.to_string();
        self.record(format!("select:{key}={}", option.text()));
        let mut state = self.state();
        let element = state.element_mut(&key)?;
        let chosen = if element.options.is_empty() {
            Some(option.text().to_string())
        } else {
            element
                .options
                .iter()
                .find(|(value, label)| match option {
                    OptionMatch::Label(l) => label.trim() == l.trim(),
                    OptionMatch::Value(v) => value == v,
                })
                .map(|(value, _)| value.clone())
        };
        match chosen {
            Some(value) => {
                element.value = Some(value);
                Ok(())
            }
            None => Err(SondeoError::page(format!(
                "no option {:?} in {key}",
                option.text()
            ))),
        }
    }

    async fn set_checked(&self, selector: &Selector, checked: bool) -> SondeoResult<()> {
        let key = selector.to_string();
        self.record(format!("check:{key}={checked}"));
        let mut state = self.state();
        state.element_mut(&key)?.checked = checked;
        Ok(())
    }

    async fn text_content(&self, selector: &Selector) -> SondeoResult<Option<String>> {
        let state = self.state();
        Ok(state
            .elements
            .get(&selector.to_string())
            .filter(|e| e.count > 0)
            .and_then(|e| e.text.clone()))
    }

    async fn current_url(&self) -> SondeoResult<String> {
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> SondeoResult<String> {
        Ok(self.state().title.clone())
    }

    async fn screenshot(&self) -> SondeoResult<Screenshot> {
        self.state()
            .screenshot
            .clone()
            .ok_or_else(|| SondeoError::ScreenshotError {
                message: "No mock screenshot set".to_string(),
            })
    }
}
