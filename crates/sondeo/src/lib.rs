//! Sondeo: resilient end-to-end automation core for Dolibarr ERP suites
//!
//! Sondeo (Spanish: "probe") drives the Dolibarr web UI through three layers:
//!
//! - **Selector resolution**: every logical element is an ordered list of
//!   candidate locators; the first one that is present and visible within a
//!   bounded wait wins.
//! - **Outcome classification**: after a submit, failure signals are checked
//!   first, then success signals by priority, and the result is folded into a
//!   tri-state verdict (success, failure, unknown).
//! - **Page objects**: Login, Member, Third party, Member type, Product and
//!   Stock screens built on the two layers above, tolerant of markup variants
//!   across Dolibarr versions and locales.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SONDEO Architecture                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ Resolver + │    │ PageDriver │            │
//! │   │ Objects    │───►│ Classifier │───►│ (chromium  │            │
//! │   │            │    │            │    │  or mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sondeo::prelude::*;
//!
//! # async fn demo(driver: &dyn PageDriver) -> SondeoResult<()> {
//! let ctx = PageContext::new(driver, "http://localhost:8080");
//! let login = LoginPage::new(&ctx);
//! login.open().await?;
//! let report = login.login(&Credentials::new("admin", "admin")).await?;
//! assert!(report.passed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod browser;
mod classifier;
mod diagnostics;
#[allow(clippy::missing_errors_doc)]
mod driver;
mod locator;
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
mod page_object;
/// Dolibarr page objects
#[allow(clippy::missing_errors_doc)]
pub mod pages;
mod resolver;
mod result;
mod wait;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use classifier::{
    Classifier, OutcomeSignal, OutcomeVerdict, Polarity, SignalCheck, SignalEvaluation,
    SignalState, UnknownPolicy,
};
pub use diagnostics::{DiagnosticSink, NoDiagnostics, ScreenshotSink};
pub use driver::{
    DriverConfig, MockDriver, MockEffect, MockElement, OptionMatch, PageDriver, Screenshot,
    SelectBy,
};
pub use locator::{
    CandidateSelector, ElementProbe, Selector, Visibility, DEFAULT_CANDIDATE_TIMEOUT_MS,
};
pub use page_object::{
    run_operation, Choice, FieldBundle, FieldControl, FieldSpec, FieldValue, NavigationPlan,
    NavigationRoute, Operation, OperationPhase, OperationReport, PageContext, PageObject,
    ResolvedField, Strictness,
};
pub use resolver::{ResolvedElement, ResolvedHandle, Resolver};
pub use result::{SondeoError, SondeoResult};
pub use wait::{
    poll_until, settle, Timeouts, WaitOptions, WaitOutcome, DEFAULT_ERROR_SIGNAL_TIMEOUT_MS,
    DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SIGNAL_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "browser")]
    pub use super::browser::*;
    pub use super::classifier::*;
    pub use super::diagnostics::*;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::page_object::*;
    pub use super::pages::*;
    pub use super::resolver::*;
    pub use super::result::*;
    pub use super::wait::*;
}
