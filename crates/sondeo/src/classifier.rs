//! Outcome classification: did the action just performed succeed?
//!
//! An operation declares a set of [`OutcomeSignal`]s, each one independent
//! heuristic (an error banner, a success banner, a new record id in the URL,
//! the originating form disappearing, a domain marker in the title). The
//! [`Classifier`] folds them into an [`OutcomeVerdict`]:
//!
//! 1. Failure signals first, each within the error-signal bound. The first
//!    one present decides `Failure`, whatever the positives would say.
//! 2. Success signals next, in priority order. The first one present decides
//!    `Success`.
//! 3. Nothing fired: `Unknown`.
//!
//! Within a polarity, lower priority rank goes first and ties keep
//! declaration order. Evaluation is bounded per signal and never raises. A
//! failed element lookup only means "not yet"; a signal whose lookups never
//! answered within its bound is [`SignalState::Indeterminate`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::PageDriver;
use crate::locator::{CandidateSelector, Selector, Visibility};
use crate::result::{SondeoError, SondeoResult};
use crate::wait::{poll_until, Timeouts, WaitOptions, WaitOutcome};

/// Which verdict a signal confirms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Present means the operation worked
    Success,
    /// Present means the operation was rejected
    Failure,
}

/// What a signal looks at
#[derive(Debug, Clone)]
pub enum SignalCheck {
    /// Any candidate becomes visible (banners, markers)
    ElementVisible(CandidateSelector),
    /// No candidate is visible any more (the submitted form)
    ElementGone(CandidateSelector),
    /// The URL matches a pattern (new record id)
    UrlMatches(Regex),
    /// The URL differs from `from`, or from the URL at submit time when `None`
    UrlChanged {
        /// Reference URL
        from: Option<String>,
    },
    /// The URL no longer contains a fragment (left the login page)
    UrlNotContains(String),
    /// The document title contains a marker (the name just entered)
    TitleContains(String),
}

impl SignalCheck {
    /// URL carries a numeric record identifier (`?id=12`, `&rowid=3`, `&socid=5`)
    pub fn new_record_id() -> SondeoResult<Self> {
        Regex::new(r"[?&](?:id|rowid|socid)=\d+")
            .map(Self::UrlMatches)
            .map_err(|e| SondeoError::InvalidSelector {
                message: e.to_string(),
            })
    }
}

/// One named heuristic with its polarity and rank
#[derive(Debug, Clone)]
pub struct OutcomeSignal {
    name: String,
    check: SignalCheck,
    polarity: Polarity,
    priority: u8,
    timeout: Option<Duration>,
}

impl OutcomeSignal {
    /// A signal confirming success
    #[must_use]
    pub fn success(name: impl Into<String>, check: SignalCheck) -> Self {
        Self {
            name: name.into(),
            check,
            polarity: Polarity::Success,
            priority: 0,
            timeout: None,
        }
    }

    /// A signal confirming failure
    #[must_use]
    pub fn failure(name: impl Into<String>, check: SignalCheck) -> Self {
        Self {
            name: name.into(),
            check,
            polarity: Polarity::Failure,
            priority: 0,
            timeout: None,
        }
    }

    /// Set the rank (lower is evaluated first)
    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Override the wait for this signal
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Signal name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Polarity
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Rank
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// What the signal looks at
    #[must_use]
    pub const fn check(&self) -> &SignalCheck {
        &self.check
    }
}

/// Tri-state result of evaluating one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    /// The condition held within the bound
    Present,
    /// The condition was still false at the deadline
    Absent,
    /// The evaluation errored or never answered
    Indeterminate,
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Indeterminate => "indeterminate",
        };
        f.write_str(s)
    }
}

/// Result of evaluating one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEvaluation {
    /// Tri-state outcome
    pub state: SignalState,
    /// Selector that made an element check fire
    pub matched: Option<Selector>,
}

impl SignalEvaluation {
    const fn of(state: SignalState) -> Self {
        Self {
            state,
            matched: None,
        }
    }
}

/// Folded verdict for one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum OutcomeVerdict {
    /// A success signal fired and no failure signal did
    Success {
        /// Name of the deciding signal
        signal: String,
    },
    /// A failure signal fired
    Failure {
        /// Name of the deciding signal
        signal: String,
        /// Text of the error banner, when there was one
        message: Option<String>,
    },
    /// Nothing fired within the bounds
    Unknown {
        /// Every signal evaluated with its state
        evaluated: Vec<(String, SignalState)>,
    },
}

impl OutcomeVerdict {
    /// Whether this verdict counts as a pass under `policy`
    #[must_use]
    pub const fn passes(&self, policy: UnknownPolicy) -> bool {
        match self {
            Self::Success { .. } => true,
            Self::Failure { .. } => false,
            Self::Unknown { .. } => matches!(policy, UnknownPolicy::Optimistic),
        }
    }

    /// Short label: success, failure or unknown
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Whether this is `Success`
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether this is `Failure`
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Whether this is `Unknown`
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

impl fmt::Display for OutcomeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { signal } => write!(f, "success ({signal})"),
            Self::Failure {
                signal,
                message: Some(message),
            } => write!(f, "failure ({signal}: {message})"),
            Self::Failure {
                signal,
                message: None,
            } => write!(f, "failure ({signal})"),
            Self::Unknown { evaluated } => {
                let states: Vec<String> = evaluated
                    .iter()
                    .map(|(name, state)| format!("{name}={state}"))
                    .collect();
                write!(f, "unknown [{}]", states.join(", "))
            }
        }
    }
}

/// How an `Unknown` verdict is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Unknown counts as failure (creations)
    #[default]
    Conservative,
    /// Unknown counts as success (idempotent edits)
    Optimistic,
}

/// Evaluates outcome signals against one page
#[derive(Clone)]
pub struct Classifier<'a> {
    driver: &'a dyn PageDriver,
    timeouts: Timeouts,
    url_before: Option<String>,
}

impl fmt::Debug for Classifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("timeouts", &self.timeouts)
            .field("url_before", &self.url_before)
            .finish_non_exhaustive()
    }
}

impl<'a> Classifier<'a> {
    /// Create a classifier over a driver
    #[must_use]
    pub const fn new(driver: &'a dyn PageDriver, timeouts: Timeouts) -> Self {
        Self {
            driver,
            timeouts,
            url_before: None,
        }
    }

    /// Record the URL at submit time for `UrlChanged { from: None }`
    #[must_use]
    pub fn with_url_before(mut self, url: impl Into<String>) -> Self {
        self.url_before = Some(url.into());
        self
    }

    fn bound_for(&self, signal: &OutcomeSignal) -> Duration {
        signal.timeout.unwrap_or(match signal.polarity {
            Polarity::Failure => self.timeouts.error_signal,
            Polarity::Success => self.timeouts.signal,
        })
    }

    /// Evaluate one signal within its bound.
    ///
    /// A check that errors is retried until the deadline: lookups fail while
    /// the page reloads after a submit. The state is `Indeterminate` only
    /// when no attempt ever answered.
    pub async fn evaluate(&self, signal: &OutcomeSignal) -> SignalEvaluation {
        let options = self.timeouts.wait(self.bound_for(signal));
        let driver = self.driver;
        let evaluation = match &signal.check {
            SignalCheck::ElementVisible(candidates) => {
                poll_signal(&options, move || any_visible(driver, candidates)).await
            }
            SignalCheck::ElementGone(candidates) => {
                poll_signal(&options, move || async move {
                    Ok::<_, SondeoError>(fired(all_gone(driver, candidates).await?))
                })
                .await
            }
            SignalCheck::UrlMatches(pattern) => {
                poll_signal(&options, move || async move {
                    let url = driver.current_url().await?;
                    Ok::<_, SondeoError>(fired(pattern.is_match(&url)))
                })
                .await
            }
            SignalCheck::UrlChanged { from } => {
                let Some(reference) = from.as_deref().or(self.url_before.as_deref()) else {
                    return SignalEvaluation::of(SignalState::Indeterminate);
                };
                poll_signal(&options, move || async move {
                    let url = driver.current_url().await?;
                    Ok::<_, SondeoError>(fired(url != reference))
                })
                .await
            }
            SignalCheck::UrlNotContains(fragment) => {
                poll_signal(&options, move || async move {
                    let url = driver.current_url().await?;
                    Ok::<_, SondeoError>(fired(!url.contains(fragment.as_str())))
                })
                .await
            }
            SignalCheck::TitleContains(marker) => {
                poll_signal(&options, move || async move {
                    let title = driver.title().await?;
                    Ok::<_, SondeoError>(fired(title.contains(marker.as_str())))
                })
                .await
            }
        };
        debug!(signal = signal.name(), state = %evaluation.state, "signal evaluated");
        evaluation
    }

    /// Fold the signals into a verdict
    pub async fn classify(&self, signals: &[OutcomeSignal]) -> OutcomeVerdict {
        let mut evaluated = Vec::with_capacity(signals.len());

        for signal in ordered(signals, Polarity::Failure) {
            let evaluation = self.evaluate(signal).await;
            if evaluation.state == SignalState::Present {
                let message = match &evaluation.matched {
                    Some(selector) => self.banner_text(selector).await,
                    None => None,
                };
                let verdict = OutcomeVerdict::Failure {
                    signal: signal.name().to_string(),
                    message,
                };
                info!(%verdict, "classified");
                return verdict;
            }
            evaluated.push((signal.name().to_string(), evaluation.state));
        }

        for signal in ordered(signals, Polarity::Success) {
            let evaluation = self.evaluate(signal).await;
            if evaluation.state == SignalState::Present {
                let verdict = OutcomeVerdict::Success {
                    signal: signal.name().to_string(),
                };
                info!(%verdict, "classified");
                return verdict;
            }
            evaluated.push((signal.name().to_string(), evaluation.state));
        }

        let verdict = OutcomeVerdict::Unknown { evaluated };
        info!(%verdict, "classified");
        verdict
    }

    async fn banner_text(&self, selector: &Selector) -> Option<String> {
        let read = tokio::time::timeout(self.timeouts.error_signal, self.driver.text_content(selector));
        match read.await {
            Ok(Ok(Some(text))) => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        }
    }
}

/// Poll a signal check, treating a failed attempt as "not yet"
async fn poll_signal<F, Fut>(options: &WaitOptions, mut check: F) -> SignalEvaluation
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SondeoResult<Option<Option<Selector>>>>,
{
    let answered = AtomicBool::new(false);
    let answered_ref = &answered;
    let outcome = poll_until(options, move || {
        let attempt = check();
        async move {
            match attempt.await {
                Ok(answer) => {
                    answered_ref.store(true, Ordering::Relaxed);
                    Ok(answer)
                }
                Err(err) => {
                    debug!(error = %err, "signal check failed, retrying");
                    Ok(None)
                }
            }
        }
    })
    .await;
    match outcome {
        WaitOutcome::Ready(matched) => SignalEvaluation {
            state: SignalState::Present,
            matched,
        },
        WaitOutcome::TimedOut | WaitOutcome::Stalled if answered.load(Ordering::Relaxed) => {
            SignalEvaluation::of(SignalState::Absent)
        }
        WaitOutcome::TimedOut | WaitOutcome::Stalled | WaitOutcome::Failed(_) => {
            SignalEvaluation::of(SignalState::Indeterminate)
        }
    }
}

/// Poll answer for checks that have no matched element
const fn fired(condition: bool) -> Option<Option<Selector>> {
    if condition {
        Some(None)
    } else {
        None
    }
}

fn ordered(signals: &[OutcomeSignal], polarity: Polarity) -> Vec<&OutcomeSignal> {
    let mut selected: Vec<&OutcomeSignal> =
        signals.iter().filter(|s| s.polarity == polarity).collect();
    selected.sort_by_key(|s| s.priority);
    selected
}

/// First candidate satisfying its visibility, if any. Errors only when every
/// candidate errored.
async fn any_visible(
    driver: &dyn PageDriver,
    candidates: &CandidateSelector,
) -> SondeoResult<Option<Option<Selector>>> {
    let mut last_error = None;
    let mut answered = false;
    for selector in candidates.candidates() {
        match driver.probe(selector).await {
            Ok(probe) => {
                answered = true;
                if candidates.visibility().is_met(&probe) {
                    return Ok(Some(Some(selector.clone())));
                }
            }
            Err(err) => last_error = Some(err),
        }
    }
    match last_error {
        Some(err) if !answered => Err(err),
        _ => Ok(None),
    }
}

/// Whether no candidate satisfies its visibility. Errors only when every
/// candidate errored.
async fn all_gone(driver: &dyn PageDriver, candidates: &CandidateSelector) -> SondeoResult<bool> {
    let mut last_error = None;
    let mut answered = false;
    let visibility = match candidates.visibility() {
        Visibility::Interactable => Visibility::Visible,
        other => other,
    };
    for selector in candidates.candidates() {
        match driver.probe(selector).await {
            Ok(probe) => {
                answered = true;
                if visibility.is_met(&probe) {
                    return Ok(false);
                }
            }
            Err(err) => last_error = Some(err),
        }
    }
    match last_error {
        Some(err) if !answered => Err(err),
        Some(_) => Ok(false),
        None => Ok(true),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockElement};
    use proptest::prelude::*;
    use tokio::time::Instant;

    fn banner(name: &str, css: &str) -> SignalCheck {
        SignalCheck::ElementVisible(CandidateSelector::first(name, css))
    }

    fn fast() -> Timeouts {
        Timeouts::default()
            .with_signal(Duration::from_millis(500))
            .with_error_signal(Duration::from_millis(300))
    }

    mod verdict_tests {
        use super::*;

        #[test]
        fn test_policy_mapping() {
            let unknown = OutcomeVerdict::Unknown { evaluated: vec![] };
            assert!(!unknown.passes(UnknownPolicy::Conservative));
            assert!(unknown.passes(UnknownPolicy::Optimistic));
            let failure = OutcomeVerdict::Failure {
                signal: "error banner".to_string(),
                message: None,
            };
            assert!(!failure.passes(UnknownPolicy::Optimistic));
        }

        #[test]
        fn test_display() {
            let failure = OutcomeVerdict::Failure {
                signal: "error banner".to_string(),
                message: Some("Name is required".to_string()),
            };
            assert_eq!(failure.to_string(), "failure (error banner: Name is required)");
            let unknown = OutcomeVerdict::Unknown {
                evaluated: vec![
                    ("error banner".to_string(), SignalState::Absent),
                    ("record id".to_string(), SignalState::Indeterminate),
                ],
            };
            assert_eq!(
                unknown.to_string(),
                "unknown [error banner=absent, record id=indeterminate]"
            );
        }

        #[test]
        fn test_record_id_pattern() {
            let SignalCheck::UrlMatches(re) = SignalCheck::new_record_id().unwrap() else {
                panic!("expected a URL pattern");
            };
            assert!(re.is_match("/adherents/card.php?id=42"));
            assert!(re.is_match("/societe/card.php?action=x&socid=5"));
            assert!(!re.is_match("/adherents/card.php?action=create"));
        }
    }

    mod evaluate_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_element_visible_captures_selector() {
            let driver = MockDriver::new().with_element("div.ok", MockElement::visible());
            let classifier = Classifier::new(&driver, fast());
            let signal = OutcomeSignal::success(
                "success banner",
                SignalCheck::ElementVisible(CandidateSelector::first("banner", ".ok").or("div.ok")),
            );
            let evaluation = classifier.evaluate(&signal).await;
            assert_eq!(evaluation.state, SignalState::Present);
            assert_eq!(evaluation.matched, Some(Selector::css("div.ok")));
        }

        #[tokio::test(start_paused = true)]
        async fn test_absent_after_bound() {
            let driver = MockDriver::new();
            let classifier = Classifier::new(&driver, fast());
            let start = Instant::now();
            let evaluation = classifier
                .evaluate(&OutcomeSignal::success("banner", banner("banner", ".ok")))
                .await;
            assert_eq!(evaluation.state, SignalState::Absent);
            assert_eq!(start.elapsed(), Duration::from_millis(500));
        }

        #[tokio::test(start_paused = true)]
        async fn test_errors_and_hangs_are_indeterminate() {
            let driver = MockDriver::new()
                .with_element(".broken", MockElement::broken())
                .with_element(".slow", MockElement::hanging());
            let classifier = Classifier::new(&driver, fast());
            let broken = classifier
                .evaluate(&OutcomeSignal::failure("e", banner("e", ".broken")))
                .await;
            assert_eq!(broken.state, SignalState::Indeterminate);
            let slow = classifier
                .evaluate(&OutcomeSignal::failure("e", banner("e", ".slow")))
                .await;
            assert_eq!(slow.state, SignalState::Indeterminate);
        }

        #[tokio::test(start_paused = true)]
        async fn test_url_changed_without_reference_is_indeterminate() {
            let driver = MockDriver::new().with_url("http://erp/index.php");
            let signal = OutcomeSignal::success("url changed", SignalCheck::UrlChanged { from: None });
            let classifier = Classifier::new(&driver, fast());
            assert_eq!(classifier.evaluate(&signal).await.state, SignalState::Indeterminate);
            let classifier = classifier.with_url_before("http://erp/index.php");
            assert_eq!(classifier.evaluate(&signal).await.state, SignalState::Absent);
        }

        #[tokio::test(start_paused = true)]
        async fn test_element_gone_waits_for_removal() {
            let driver = MockDriver::new()
                .with_element("form#login", MockElement::visible())
                .with_element("#go", MockElement::visible())
                .on_click(
                    "#go",
                    MockEffect::new()
                        .after(Duration::from_millis(200))
                        .remove("form#login"),
                );
            driver.click(&Selector::css("#go")).await.unwrap();
            let classifier = Classifier::new(&driver, fast());
            let signal = OutcomeSignal::success(
                "form gone",
                SignalCheck::ElementGone(CandidateSelector::first("login form", "form#login")),
            );
            assert_eq!(classifier.evaluate(&signal).await.state, SignalState::Present);
        }

        #[tokio::test(start_paused = true)]
        async fn test_title_and_url_fragment() {
            let driver = MockDriver::new()
                .with_url("http://erp/adherents/card.php?id=3")
                .with_title("Ana Lopez - Member");
            let classifier = Classifier::new(&driver, fast());
            let title = OutcomeSignal::success("title", SignalCheck::TitleContains("Ana".to_string()));
            let left = OutcomeSignal::success(
                "left create form",
                SignalCheck::UrlNotContains("action=create".to_string()),
            );
            assert_eq!(classifier.evaluate(&title).await.state, SignalState::Present);
            assert_eq!(classifier.evaluate(&left).await.state, SignalState::Present);
        }
    }

    mod classify_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_error_wins_over_success() {
            let driver = MockDriver::new()
                .with_element("div.error", MockElement::visible().with_text("  Login failed \n"))
                .with_element("div.ok", MockElement::visible());
            let signals = vec![
                OutcomeSignal::success("success banner", banner("ok", "div.ok")),
                OutcomeSignal::failure("error banner", banner("error", "div.error")),
            ];
            let verdict = Classifier::new(&driver, fast()).classify(&signals).await;
            assert_eq!(
                verdict,
                OutcomeVerdict::Failure {
                    signal: "error banner".to_string(),
                    message: Some("Login failed".to_string()),
                }
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_priority_order_among_positives() {
            let driver = MockDriver::new()
                .with_url("http://erp/card.php?id=9")
                .with_element("div.ok", MockElement::visible());
            let signals = vec![
                OutcomeSignal::success("record id", SignalCheck::new_record_id().unwrap()).with_priority(2),
                OutcomeSignal::success("success banner", banner("ok", "div.ok")).with_priority(1),
            ];
            let verdict = Classifier::new(&driver, fast()).classify(&signals).await;
            assert_eq!(
                verdict,
                OutcomeVerdict::Success {
                    signal: "success banner".to_string()
                }
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_nothing_fires_is_unknown_within_bounds() {
            let driver = MockDriver::new().with_url("http://erp/card.php?action=create");
            let signals = vec![
                OutcomeSignal::failure("error banner", banner("error", "div.error")),
                OutcomeSignal::success("success banner", banner("ok", "div.ok")),
                OutcomeSignal::success("record id", SignalCheck::new_record_id().unwrap()),
            ];
            let start = Instant::now();
            let verdict = Classifier::new(&driver, fast()).classify(&signals).await;
            assert!(verdict.is_unknown());
            assert_eq!(start.elapsed(), Duration::from_millis(300 + 500 + 500));
            let OutcomeVerdict::Unknown { evaluated } = verdict else {
                unreachable!()
            };
            assert_eq!(evaluated.len(), 3);
            assert!(evaluated.iter().all(|(_, s)| *s == SignalState::Absent));
        }

        #[tokio::test(start_paused = true)]
        async fn test_error_banner_after_failed_lookups_still_wins() {
            let driver = MockDriver::new()
                .with_url("http://erp/index.php?mainmenu=login")
                .with_element("#login", MockElement::visible())
                .on_click(
                    "#login",
                    MockEffect::new()
                        .navigate_to("http://erp/index.php")
                        .show("div.error", MockElement::broken())
                        .then(
                            MockEffect::new()
                                .after(Duration::from_millis(200))
                                .show(
                                    "div.error",
                                    MockElement::visible().with_text("Bad value for login or password"),
                                ),
                        ),
                );
            driver.click(&Selector::css("#login")).await.unwrap();
            let signals = vec![
                OutcomeSignal::failure("error banner", banner("error", "div.error")),
                OutcomeSignal::success("url changed", SignalCheck::UrlChanged { from: None }),
            ];
            let verdict = Classifier::new(&driver, fast())
                .with_url_before("http://erp/index.php?mainmenu=login")
                .classify(&signals)
                .await;
            assert_eq!(
                verdict,
                OutcomeVerdict::Failure {
                    signal: "error banner".to_string(),
                    message: Some("Bad value for login or password".to_string()),
                }
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_lookups_then_nothing_is_absent() {
            let driver = MockDriver::new()
                .with_element("#save", MockElement::visible())
                .with_element("div.error", MockElement::broken())
                .on_click(
                    "#save",
                    MockEffect::new()
                        .after(Duration::from_millis(100))
                        .remove("div.error"),
                );
            driver.click(&Selector::css("#save")).await.unwrap();
            let evaluation = Classifier::new(&driver, fast())
                .evaluate(&OutcomeSignal::failure("error banner", banner("error", "div.error")))
                .await;
            assert_eq!(evaluation.state, SignalState::Absent);
        }

        #[tokio::test(start_paused = true)]
        async fn test_late_success_banner_is_seen() {
            let driver = MockDriver::new()
                .with_element("#save", MockElement::visible())
                .on_click(
                    "#save",
                    MockEffect::new()
                        .after(Duration::from_millis(700))
                        .show("div.ok", MockElement::visible()),
                );
            driver.click(&Selector::css("#save")).await.unwrap();
            let signals = vec![
                OutcomeSignal::failure("error banner", banner("error", "div.error")),
                OutcomeSignal::success("success banner", banner("ok", "div.ok")),
            ];
            let verdict = Classifier::new(&driver, fast()).classify(&signals).await;
            assert!(verdict.is_success());
        }
    }

    mod property_tests {
        use super::*;

        fn classify_blocking(driver: &MockDriver, signals: &[OutcomeSignal]) -> OutcomeVerdict {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let timeouts = Timeouts::default()
                .with_signal(Duration::from_millis(50))
                .with_error_signal(Duration::from_millis(50));
            runtime.block_on(Classifier::new(driver, timeouts).classify(signals))
        }

        fn scripted(spec: &[(bool, bool, u8)]) -> (MockDriver, Vec<OutcomeSignal>) {
            let mut driver = MockDriver::new();
            let mut signals = Vec::new();
            for (i, (is_failure, present, priority)) in spec.iter().enumerate() {
                let css = format!("#signal-{i}");
                if *present {
                    driver = driver.with_element(css.as_str(), MockElement::visible());
                }
                let name = format!("signal-{i}");
                let check = banner(&name, &css);
                let signal = if *is_failure {
                    OutcomeSignal::failure(name, check)
                } else {
                    OutcomeSignal::success(name, check)
                };
                signals.push(signal.with_priority(*priority));
            }
            (driver, signals)
        }

        proptest! {
            #[test]
            fn prop_any_present_failure_decides(spec in prop::collection::vec((any::<bool>(), any::<bool>(), 0u8..4), 1..8)) {
                let (driver, signals) = scripted(&spec);
                let verdict = classify_blocking(&driver, &signals);
                let failure_present = spec.iter().any(|(f, p, _)| *f && *p);
                prop_assert_eq!(verdict.is_failure(), failure_present);
            }

            #[test]
            fn prop_one_true_signal_is_never_unknown(spec in prop::collection::vec((any::<bool>(), any::<bool>(), 0u8..4), 1..8)) {
                let (driver, signals) = scripted(&spec);
                let verdict = classify_blocking(&driver, &signals);
                let any_present = spec.iter().any(|(_, p, _)| *p);
                prop_assert_eq!(verdict.is_unknown(), !any_present);
            }

            #[test]
            fn prop_success_is_highest_ranked_present(spec in prop::collection::vec((Just(false), any::<bool>(), 0u8..4), 1..8)) {
                let (driver, signals) = scripted(&spec);
                let verdict = classify_blocking(&driver, &signals);
                let expected = spec
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, p, _))| *p)
                    .min_by_key(|(i, (_, _, rank))| (*rank, *i))
                    .map(|(i, _)| format!("signal-{i}"));
                match expected {
                    Some(name) => prop_assert_eq!(verdict, OutcomeVerdict::Success { signal: name }),
                    None => prop_assert!(verdict.is_unknown()),
                }
            }
        }
    }
}
