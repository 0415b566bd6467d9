//! Page Object composition layer.
//!
//! A page object owns candidate lists for its fields and buttons plus an
//! outcome-signal set per operation. It describes each operation as an
//! [`Operation`] and hands it to [`run_operation`], which:
//!
//! 1. rejects bundle keys the operation does not declare,
//! 2. fills every field present in the bundle, in declaration order,
//!    failing fast when a field cannot be resolved or set,
//! 3. resolves and clicks the submit control,
//! 4. classifies the outcome and applies the operation's [`UnknownPolicy`]
//!    and the context's [`Strictness`].
//!
//! Phases run `Idle -> FieldsPopulating -> Submitted -> Classifying ->
//! verdict` and never go back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, OutcomeSignal, OutcomeVerdict, UnknownPolicy};
use crate::diagnostics::{DiagnosticSink, NoDiagnostics};
use crate::driver::{PageDriver, SelectBy};
use crate::locator::CandidateSelector;
use crate::resolver::{ResolvedHandle, Resolver};
use crate::result::{SondeoError, SondeoResult};
use crate::wait::{settle, Timeouts};

static NO_DIAGNOSTICS: NoDiagnostics = NoDiagnostics;

/// Trait for page objects representing one logical screen of the ERP.
pub trait PageObject {
    /// Path of the screen relative to the base URL (e.g. "/adherents/card.php")
    fn url_pattern(&self) -> &str;

    /// Page name for logging and error messages
    fn page_name(&self) -> &str;
}

// ============================================================================
// Field values
// ============================================================================

/// One loosely-typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Yes/no
    Flag(bool),
    /// Numeric input
    Number(f64),
    /// Free text or an option label
    Text(String),
}

impl FieldValue {
    /// Text form used to fill inputs and match options
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Whether the value reads as "yes"
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "yes" | "si" | "sí" | "1" | "on"
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

/// Field name to value; only present keys are acted upon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBundle(BTreeMap<String, FieldValue>);

impl FieldBundle {
    /// Create an empty bundle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Add a field if the value is present
    #[must_use]
    pub fn with_opt<V: Into<FieldValue>>(mut self, field: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(field, value);
        }
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Value of a field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Field names present
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bundle is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Field specs
// ============================================================================

/// Maps accepted bundle values to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice<T> {
    accepts: Vec<String>,
    target: T,
}

impl<T> Choice<T> {
    /// Values (case-insensitive) that select `target`
    #[must_use]
    pub fn new<I, S>(accepts: I, target: T) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepts: accepts.into_iter().map(Into::into).collect(),
            target,
        }
    }

    fn matches(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        self.accepts.iter().any(|a| a.trim().to_lowercase() == value)
    }
}

/// How a field is set
#[derive(Debug, Clone)]
pub enum FieldControl {
    /// Text input: fill with the value's text
    Input(CandidateSelector),
    /// Native select; `choices` translates bundle values to option labels or
    /// values, an empty list passes the value through
    Select {
        /// The select element
        candidates: CandidateSelector,
        /// Match options by label or value
        by: SelectBy,
        /// Bundle value translations
        choices: Vec<Choice<String>>,
    },
    /// Radio group: each choice owns the candidates for its radio button
    Radio(Vec<Choice<CandidateSelector>>),
    /// Checkbox driven by the value's truthiness
    Checkbox(CandidateSelector),
}

/// One logical field of an operation
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    control: FieldControl,
    only_when: Option<(String, Vec<String>)>,
    settle: Duration,
}

impl FieldSpec {
    fn new(name: impl Into<String>, control: FieldControl) -> Self {
        Self {
            name: name.into(),
            control,
            only_when: None,
            settle: Duration::ZERO,
        }
    }

    /// Text input field
    #[must_use]
    pub fn input(name: impl Into<String>, candidates: CandidateSelector) -> Self {
        Self::new(name, FieldControl::Input(candidates))
    }

    /// Select field with pass-through values
    #[must_use]
    pub fn select(name: impl Into<String>, candidates: CandidateSelector, by: SelectBy) -> Self {
        Self::new(
            name,
            FieldControl::Select {
                candidates,
                by,
                choices: Vec::new(),
            },
        )
    }

    /// Radio group field
    #[must_use]
    pub fn radio(name: impl Into<String>, options: Vec<Choice<CandidateSelector>>) -> Self {
        Self::new(name, FieldControl::Radio(options))
    }

    /// Checkbox field
    #[must_use]
    pub fn checkbox(name: impl Into<String>, candidates: CandidateSelector) -> Self {
        Self::new(name, FieldControl::Checkbox(candidates))
    }

    /// Translate bundle values for a select field
    #[must_use]
    pub fn with_choices(mut self, choices: Vec<Choice<String>>) -> Self {
        if let FieldControl::Select { choices: c, .. } = &mut self.control {
            *c = choices;
        }
        self
    }

    /// Apply this field only when `field` holds one of `values`
    #[must_use]
    pub fn only_when<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_when = Some((field.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Fixed delay after setting, for widgets that re-render the form
    #[must_use]
    pub const fn with_settle(mut self, delay: Duration) -> Self {
        self.settle = delay;
        self
    }

    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn applies(&self, bundle: &FieldBundle) -> bool {
        match &self.only_when {
            None => true,
            Some((field, values)) => bundle.get(field).is_some_and(|v| {
                let text = v.as_text().trim().to_lowercase();
                values.iter().any(|accepted| {
                    let accepted = accepted.trim().to_lowercase();
                    accepted == text || (accepted == "true" && v.is_truthy())
                })
            }),
        }
    }
}

fn expected<T>(choices: &[Choice<T>]) -> String {
    choices
        .iter()
        .flat_map(|c| c.accepts.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Operations
// ============================================================================

/// One user-facing operation: fields, a submit control and outcome signals
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    page: String,
    fields: Vec<FieldSpec>,
    submit: CandidateSelector,
    confirm: Option<CandidateSelector>,
    signals: Vec<OutcomeSignal>,
    policy: UnknownPolicy,
}

impl Operation {
    /// Create an operation on a page
    #[must_use]
    pub fn new(name: impl Into<String>, page: impl Into<String>, submit: CandidateSelector) -> Self {
        Self {
            name: name.into(),
            page: page.into(),
            fields: Vec::new(),
            submit,
            confirm: None,
            signals: Vec::new(),
            policy: UnknownPolicy::default(),
        }
    }

    /// Confirmation dialog that may follow the submit. It is clicked when it
    /// shows up; a missing dialog goes straight to classification.
    #[must_use]
    pub fn with_confirmation(mut self, confirm: CandidateSelector) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Declare a field; fields are applied in declaration order
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare an outcome signal
    #[must_use]
    pub fn signal(mut self, signal: OutcomeSignal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Set how `Unknown` is treated
    #[must_use]
    pub const fn with_policy(mut self, policy: UnknownPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Operation name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field names, in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldSpec::name)
    }

    /// Outcome signals
    #[must_use]
    pub fn signals(&self) -> &[OutcomeSignal] {
        &self.signals
    }

    /// Unknown policy
    #[must_use]
    pub const fn policy(&self) -> UnknownPolicy {
        self.policy
    }
}

/// Lifecycle of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    /// Nothing done yet
    Idle,
    /// Fields are being resolved and set
    FieldsPopulating,
    /// Submit control clicked
    Submitted,
    /// Waiting on outcome signals
    Classifying,
    /// Verdict: success
    Success,
    /// Verdict: failure
    Failure,
    /// Verdict: unknown
    Unknown,
}

impl OperationPhase {
    fn of(verdict: &OutcomeVerdict) -> Self {
        match verdict {
            OutcomeVerdict::Success { .. } => Self::Success,
            OutcomeVerdict::Failure { .. } => Self::Failure,
            OutcomeVerdict::Unknown { .. } => Self::Unknown,
        }
    }
}

/// What to do with a verdict that does not pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Return the verdict in the report
    #[default]
    Report,
    /// Raise `OperationFailed`
    Raise,
}

/// Which selector won for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedField {
    /// Logical field name
    pub field: String,
    /// Winning selector
    pub selector: String,
    /// Index of the winner in its candidate list
    pub index: usize,
}

impl From<&ResolvedHandle<'_>> for ResolvedField {
    fn from(handle: &ResolvedHandle<'_>) -> Self {
        Self {
            field: handle.name().to_string(),
            selector: handle.selector().to_string(),
            index: handle.index(),
        }
    }
}

/// Record of one operation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    /// Operation name
    pub operation: String,
    /// Phases traversed, in order
    pub phases: Vec<OperationPhase>,
    /// Winners for every element touched
    pub resolved: Vec<ResolvedField>,
    /// Folded verdict
    pub verdict: OutcomeVerdict,
    /// Verdict passes under the operation's policy
    pub passed: bool,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds
    pub elapsed_ms: u64,
}

impl OperationReport {
    /// Final phase
    #[must_use]
    pub fn phase(&self) -> OperationPhase {
        self.phases.last().copied().unwrap_or(OperationPhase::Idle)
    }

    /// Winner recorded for a field
    #[must_use]
    pub fn winner(&self, field: &str) -> Option<&ResolvedField> {
        self.resolved.iter().find(|r| r.field == field)
    }
}

// ============================================================================
// Page context
// ============================================================================

/// Everything a page object needs from the running suite
#[derive(Clone)]
pub struct PageContext<'a> {
    driver: &'a dyn PageDriver,
    base_url: String,
    timeouts: Timeouts,
    strictness: Strictness,
    diagnostics: &'a dyn DiagnosticSink,
}

impl fmt::Debug for PageContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("base_url", &self.base_url)
            .field("timeouts", &self.timeouts)
            .field("strictness", &self.strictness)
            .finish_non_exhaustive()
    }
}

impl<'a> PageContext<'a> {
    /// Create a context over a driver and an ERP base URL
    #[must_use]
    pub fn new(driver: &'a dyn PageDriver, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts: Timeouts::default(),
            strictness: Strictness::default(),
            diagnostics: &NO_DIAGNOSTICS,
        }
    }

    /// Set timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set strictness
    #[must_use]
    pub const fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Capture diagnostics through `sink` on failures
    #[must_use]
    pub fn with_diagnostics(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.diagnostics = sink;
        self
    }

    /// The driver
    #[must_use]
    pub const fn driver(&self) -> &'a dyn PageDriver {
        self.driver
    }

    /// Timeouts in effect
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Strictness in effect
    #[must_use]
    pub const fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// A resolver bound to this page
    #[must_use]
    pub const fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.driver, self.timeouts)
    }

    /// A classifier bound to this page
    #[must_use]
    pub const fn classifier(&self) -> Classifier<'a> {
        Classifier::new(self.driver, self.timeouts)
    }

    /// Absolute URL for a path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Navigate to a path, bounded by the navigation timeout
    pub async fn goto(&self, path: &str) -> SondeoResult<()> {
        let url = self.url(path);
        debug!(%url, "navigating");
        match tokio::time::timeout(self.timeouts.navigation, self.driver.goto(&url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(SondeoError::NavigationError {
                url,
                message: err.to_string(),
            }),
            Err(_) => Err(SondeoError::Timeout {
                ms: self.timeouts.navigation.as_millis() as u64,
            }),
        }
    }

    pub(crate) async fn capture(&self, operation: &str) {
        self.diagnostics.capture(operation, self.driver).await;
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Menu path to a screen with a direct URL fallback
#[derive(Debug, Clone)]
pub struct NavigationPlan {
    steps: Vec<CandidateSelector>,
    fallback: String,
}

/// How a navigation plan reached its screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationRoute {
    /// Every menu step resolved and was clicked
    Menu,
    /// A step was missing; the fallback URL was loaded
    Direct,
}

impl NavigationPlan {
    /// Plan with only the direct URL
    #[must_use]
    pub fn direct(fallback: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Add a menu click step
    #[must_use]
    pub fn step(mut self, step: CandidateSelector) -> Self {
        self.steps.push(step);
        self
    }

    /// Follow the menu; load the fallback as soon as a step cannot be
    /// resolved or clicked
    pub async fn navigate(&self, ctx: &PageContext<'_>) -> SondeoResult<NavigationRoute> {
        let resolver = ctx.resolver();
        for step in &self.steps {
            let Some(handle) = resolver.resolve(step).await.into_handle() else {
                debug!(step = step.name(), "menu step missing, using direct URL");
                ctx.goto(&self.fallback).await?;
                return Ok(NavigationRoute::Direct);
            };
            if let Err(err) = handle.click().await {
                debug!(step = step.name(), error = %err, "menu click failed, using direct URL");
                ctx.goto(&self.fallback).await?;
                return Ok(NavigationRoute::Direct);
            }
        }
        if self.steps.is_empty() {
            ctx.goto(&self.fallback).await?;
            return Ok(NavigationRoute::Direct);
        }
        Ok(NavigationRoute::Menu)
    }
}

// ============================================================================
// Running operations
// ============================================================================

async fn apply_field(
    resolver: &Resolver<'_>,
    page: &str,
    field: &FieldSpec,
    value: &FieldValue,
) -> SondeoResult<ResolvedField> {
    let text = value.as_text();
    let resolved = match &field.control {
        FieldControl::Input(candidates) => {
            let handle = resolver.require(page, candidates).await?;
            handle.fill(&text).await?;
            ResolvedField::from(&handle)
        }
        FieldControl::Select {
            candidates,
            by,
            choices,
        } => {
            let option = if choices.is_empty() {
                text
            } else {
                choices
                    .iter()
                    .find(|c| c.matches(&text))
                    .map(|c| c.target.clone())
                    .ok_or_else(|| SondeoError::InvalidValue {
                        field: field.name.clone(),
                        value: text.clone(),
                        expected: expected(choices),
                    })?
            };
            let handle = resolver.require(page, candidates).await?;
            handle.select(&by.matching(option)).await?;
            ResolvedField::from(&handle)
        }
        FieldControl::Radio(options) => {
            let choice = options
                .iter()
                .find(|c| c.matches(&text) || (c.matches("true") && value.is_truthy()))
                .ok_or_else(|| SondeoError::InvalidValue {
                    field: field.name.clone(),
                    value: text.clone(),
                    expected: expected(options),
                })?;
            let handle = resolver.require(page, &choice.target).await?;
            handle.set_checked(true).await?;
            ResolvedField {
                field: field.name.clone(),
                ..ResolvedField::from(&handle)
            }
        }
        FieldControl::Checkbox(candidates) => {
            let handle = resolver.require(page, candidates).await?;
            handle.set_checked(value.is_truthy()).await?;
            ResolvedField::from(&handle)
        }
    };
    settle(field.settle).await;
    Ok(resolved)
}

async fn populate_and_submit(
    ctx: &PageContext<'_>,
    operation: &Operation,
    bundle: &FieldBundle,
    phases: &mut Vec<OperationPhase>,
    resolved: &mut Vec<ResolvedField>,
) -> SondeoResult<Option<String>> {
    let resolver = ctx.resolver();

    phases.push(OperationPhase::FieldsPopulating);
    for field in &operation.fields {
        let Some(value) = bundle.get(field.name()) else {
            continue;
        };
        if !field.applies(bundle) {
            debug!(operation = %operation.name, field = field.name(), "field gated off");
            continue;
        }
        let winner = apply_field(&resolver, &operation.page, field, value).await?;
        debug!(operation = %operation.name, field = field.name(), selector = %winner.selector, "field set");
        resolved.push(winner);
    }

    let url_before = ctx.driver().current_url().await.ok();
    let submit = resolver.require(&operation.page, &operation.submit).await?;
    submit.click().await?;
    resolved.push(ResolvedField::from(&submit));
    if let Some(confirm) = &operation.confirm {
        match resolver.resolve(confirm).await.into_handle() {
            Some(handle) => {
                handle.click().await?;
                resolved.push(ResolvedField::from(&handle));
            }
            None => debug!(operation = %operation.name, "no confirmation dialog"),
        }
    }
    phases.push(OperationPhase::Submitted);
    Ok(url_before)
}

/// Run one operation with the given field values.
///
/// Field resolution and action errors abort immediately and are returned as
/// errors in every strictness mode. A non-passing verdict is returned in the
/// report under [`Strictness::Report`] and raised under [`Strictness::Raise`].
pub async fn run_operation(
    ctx: &PageContext<'_>,
    operation: &Operation,
    bundle: &FieldBundle,
) -> SondeoResult<OperationReport> {
    if let Some(unknown) = bundle
        .keys()
        .find(|k| !operation.field_names().any(|f| f == *k))
    {
        return Err(SondeoError::UnknownField {
            operation: operation.name.clone(),
            field: unknown.to_string(),
        });
    }

    let started_at = Utc::now();
    let start = tokio::time::Instant::now();
    let mut phases = vec![OperationPhase::Idle];
    let mut resolved = Vec::new();

    let url_before =
        match populate_and_submit(ctx, operation, bundle, &mut phases, &mut resolved).await {
            Ok(url) => url,
            Err(err) => {
                warn!(operation = %operation.name, error = %err, "operation aborted");
                ctx.capture(&operation.name).await;
                return Err(err);
            }
        };

    phases.push(OperationPhase::Classifying);
    let mut classifier = ctx.classifier();
    if let Some(url) = url_before {
        classifier = classifier.with_url_before(url);
    }
    let verdict = classifier.classify(&operation.signals).await;
    phases.push(OperationPhase::of(&verdict));

    let passed = verdict.passes(operation.policy);
    info!(operation = %operation.name, %verdict, passed, "operation finished");
    if !verdict.is_success() {
        ctx.capture(&operation.name).await;
    }
    if !passed && ctx.strictness() == Strictness::Raise {
        return Err(SondeoError::OperationFailed {
            operation: operation.name.clone(),
            verdict: verdict.to_string(),
        });
    }

    Ok(OperationReport {
        operation: operation.name.clone(),
        phases,
        resolved,
        verdict,
        passed,
        started_at,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}
