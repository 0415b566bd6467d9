//! Selector resolution: first present and visible candidate wins.
//!
//! Candidates are tried strictly in order, each within its own bounded wait.
//! A candidate whose lookup raises is skipped, not retried. Resolution never
//! acts on the page; the returned [`ResolvedHandle`] is bound to the winning
//! selector and is meant to be used for the rest of one logical operation.

use std::fmt;
use tracing::{debug, warn};

use crate::driver::{OptionMatch, PageDriver};
use crate::locator::{CandidateSelector, Selector};
use crate::result::{SondeoError, SondeoResult};
use crate::wait::{poll_until, Timeouts, WaitOutcome};

/// A usable element bound to one concrete selector
pub struct ResolvedHandle<'a> {
    driver: &'a dyn PageDriver,
    name: String,
    selector: Selector,
    index: usize,
}

impl fmt::Debug for ResolvedHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandle")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl<'a> ResolvedHandle<'a> {
    /// Logical element name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The selector that won
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Position of the winner in the candidate list
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    fn action_failed(&self, action: &str, err: SondeoError) -> SondeoError {
        SondeoError::ActionFailed {
            field: self.name.clone(),
            selector: self.selector.to_string(),
            action: action.to_string(),
            message: err.to_string(),
        }
    }

    /// Replace the element's value
    pub async fn fill(&self, value: &str) -> SondeoResult<()> {
        self.driver
            .fill(&self.selector, value)
            .await
            .map_err(|e| self.action_failed("fill", e))
    }

    /// Click the element
    pub async fn click(&self) -> SondeoResult<()> {
        self.driver
            .click(&self.selector)
            .await
            .map_err(|e| self.action_failed("click", e))
    }

    /// Choose an option
    pub async fn select(&self, option: &OptionMatch) -> SondeoResult<()> {
        self.driver
            .select_option(&self.selector, option)
            .await
            .map_err(|e| self.action_failed("select", e))
    }

    /// Check or uncheck
    pub async fn set_checked(&self, checked: bool) -> SondeoResult<()> {
        self.driver
            .set_checked(&self.selector, checked)
            .await
            .map_err(|e| self.action_failed("check", e))
    }

    /// Trimmed text content
    pub async fn text(&self) -> SondeoResult<Option<String>> {
        let text = self
            .driver
            .text_content(&self.selector)
            .await
            .map_err(|e| self.action_failed("read", e))?;
        Ok(text.map(|t| t.trim().to_string()))
    }
}

/// Result of one resolution
#[derive(Debug)]
pub enum ResolvedElement<'a> {
    /// A candidate was present and visible
    Found(ResolvedHandle<'a>),
    /// Every candidate failed
    NotFound {
        /// Display strings of the candidates tried, in order
        tried: Vec<String>,
    },
}

impl<'a> ResolvedElement<'a> {
    /// Whether a candidate won
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The handle, if found
    #[must_use]
    pub fn into_handle(self) -> Option<ResolvedHandle<'a>> {
        match self {
            Self::Found(handle) => Some(handle),
            Self::NotFound { .. } => None,
        }
    }
}

/// Resolves candidate lists against one page
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    driver: &'a dyn PageDriver,
    timeouts: Timeouts,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a driver
    #[must_use]
    pub const fn new(driver: &'a dyn PageDriver, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    /// The driver this resolver queries
    #[must_use]
    pub const fn driver(&self) -> &'a dyn PageDriver {
        self.driver
    }

    /// Timeouts in effect
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Try each candidate in order; the first present and visible one wins.
    pub async fn resolve(&self, candidates: &CandidateSelector) -> ResolvedElement<'a> {
        let visibility = candidates.visibility();
        let options = self
            .timeouts
            .wait(candidates.timeout_or(self.timeouts.candidate));
        let driver = self.driver;

        for (index, selector) in candidates.candidates().iter().enumerate() {
            let outcome = poll_until(&options, move || async move {
                let probe = driver.probe(selector).await?;
                Ok::<_, SondeoError>(visibility.is_met(&probe).then_some(probe))
            })
            .await;

            match outcome {
                WaitOutcome::Ready(_) => {
                    debug!(element = candidates.name(), %selector, index, "resolved");
                    return ResolvedElement::Found(ResolvedHandle {
                        driver,
                        name: candidates.name().to_string(),
                        selector: selector.clone(),
                        index,
                    });
                }
                WaitOutcome::Failed(err) => {
                    debug!(element = candidates.name(), %selector, error = %err, "candidate lookup failed");
                }
                WaitOutcome::TimedOut | WaitOutcome::Stalled => {
                    debug!(element = candidates.name(), %selector, "candidate not usable");
                }
            }
        }

        warn!(
            element = candidates.name(),
            tried = candidates.candidates().len(),
            "no candidate resolved"
        );
        ResolvedElement::NotFound {
            tried: candidates.described(),
        }
    }

    /// Resolve a mandatory element, turning exhaustion into `FieldNotFound`
    pub async fn require(
        &self,
        page: &str,
        candidates: &CandidateSelector,
    ) -> SondeoResult<ResolvedHandle<'a>> {
        match self.resolve(candidates).await {
            ResolvedElement::Found(handle) => Ok(handle),
            ResolvedElement::NotFound { tried } => Err(SondeoError::FieldNotFound {
                page: page.to_string(),
                field: candidates.name().to_string(),
                tried,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::Visibility;
    use std::time::Duration;
    use tokio::time::Instant;

    fn login_button() -> CandidateSelector {
        CandidateSelector::first("login button", "#login_button")
            .or("input[type=\"submit\"][name=\"login\"]")
            .or("input.button[type=\"submit\"]")
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_first_candidate_wins() {
            let driver = MockDriver::new()
                .with_element("#login_button", MockElement::visible())
                .with_element("input.button[type=\"submit\"]", MockElement::visible());
            let resolver = Resolver::new(&driver, Timeouts::default());
            let handle = resolver.resolve(&login_button()).await.into_handle().unwrap();
            assert_eq!(handle.index(), 0);
            assert_eq!(driver.probed(), vec!["#login_button"]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_short_circuit_skips_later_candidates() {
            let driver = MockDriver::new()
                .with_element("input[type=\"submit\"][name=\"login\"]", MockElement::visible())
                .with_element("input.button[type=\"submit\"]", MockElement::visible());
            let resolver = Resolver::new(&driver, Timeouts::default());
            let handle = resolver.resolve(&login_button()).await.into_handle().unwrap();
            assert_eq!(handle.index(), 1);
            assert!(!driver
                .probed()
                .contains(&"input.button[type=\"submit\"]".to_string()));
        }

        #[tokio::test(start_paused = true)]
        async fn test_broken_candidate_is_skipped() {
            let driver = MockDriver::new()
                .with_element("#login_button", MockElement::broken())
                .with_element("input[type=\"submit\"][name=\"login\"]", MockElement::visible());
            let start = Instant::now();
            let resolver = Resolver::new(&driver, Timeouts::default());
            let handle = resolver.resolve(&login_button()).await.into_handle().unwrap();
            assert_eq!(handle.selector().to_string(), "input[type=\"submit\"][name=\"login\"]");
            assert_eq!(start.elapsed(), Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_candidate_does_not_win() {
            let driver = MockDriver::new()
                .with_element("#login_button", MockElement::hidden())
                .with_element("input.button[type=\"submit\"]", MockElement::visible());
            let resolver = Resolver::new(&driver, Timeouts::default());
            let handle = resolver.resolve(&login_button()).await.into_handle().unwrap();
            assert_eq!(handle.index(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_attached_accepts_hidden() {
            let driver = MockDriver::new().with_element("#login_button", MockElement::hidden());
            let resolver = Resolver::new(&driver, Timeouts::default());
            let candidates = login_button().with_visibility(Visibility::Attached);
            assert!(resolver.resolve(&candidates).await.is_found());
        }

        #[tokio::test(start_paused = true)]
        async fn test_interactable_rejects_disabled() {
            let driver = MockDriver::new()
                .with_element("#login_button", MockElement::visible().disabled());
            let resolver = Resolver::new(&driver, Timeouts::default());
            let candidates = login_button()
                .with_visibility(Visibility::Interactable)
                .with_timeout(Duration::from_millis(100));
            assert!(!resolver.resolve(&candidates).await.is_found());
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhaustion_is_bounded() {
            let driver = MockDriver::new();
            let timeouts = Timeouts::default().with_candidate(Duration::from_millis(200));
            let resolver = Resolver::new(&driver, timeouts);
            let start = Instant::now();
            match resolver.resolve(&login_button()).await {
                ResolvedElement::NotFound { tried } => assert_eq!(tried.len(), 3),
                ResolvedElement::Found(_) => panic!("nothing should resolve"),
            }
            assert_eq!(start.elapsed(), Duration::from_millis(600));
        }

        #[tokio::test(start_paused = true)]
        async fn test_hanging_probe_costs_one_candidate_wait() {
            let driver = MockDriver::new()
                .with_element("#login_button", MockElement::hanging())
                .with_element("input[type=\"submit\"][name=\"login\"]", MockElement::visible());
            let resolver = Resolver::new(&driver, Timeouts::default());
            let start = Instant::now();
            assert!(resolver.resolve(&login_button()).await.is_found());
            assert_eq!(start.elapsed(), Duration::from_secs(2));
        }
    }

    mod require_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_require_reports_field_and_candidates() {
            let driver = MockDriver::new();
            let resolver = Resolver::new(&driver, Timeouts::default());
            let err = resolver.require("login", &login_button()).await.unwrap_err();
            match err {
                SondeoError::FieldNotFound { page, field, tried } => {
                    assert_eq!(page, "login");
                    assert_eq!(field, "login button");
                    assert_eq!(tried[0], "#login_button");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_action_failure_names_selector() {
            let driver = MockDriver::new()
                .with_element("#login_button", MockElement::visible().failing("detached"));
            let resolver = Resolver::new(&driver, Timeouts::default());
            let handle = resolver.require("login", &login_button()).await.unwrap();
            let err = handle.click().await.unwrap_err();
            match err {
                SondeoError::ActionFailed {
                    field,
                    selector,
                    action,
                    ..
                } => {
                    assert_eq!(field, "login button");
                    assert_eq!(selector, "#login_button");
                    assert_eq!(action, "click");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
