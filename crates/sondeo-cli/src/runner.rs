//! Suite runner
//!
//! Cases run one after another against a single browser page. Before every
//! case that needs a session the runner makes sure the configured account is
//! logged in, then performs the case's step through the page objects and
//! compares the observed outcome with the case's expectation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sondeo::pages::{
    Credentials, LoginPage, MemberPage, MemberTypePage, ProductData, ProductPage, StockMovement,
    StockPage, ThirdPartyPage,
};
use sondeo::{OperationReport, PageContext, PageDriver, ScreenshotSink, SondeoError, SondeoResult};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{CliConfig, SuiteConfig};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::suite::{Case, Expect, Step, Suite};

/// File name of the JSON results inside the output directory
pub const RESULTS_FILE: &str = "results.json";

/// What a step produced
#[derive(Debug)]
enum Observed {
    /// An operation ran to a verdict
    Report(OperationReport),
    /// A navigation-only step completed
    Done,
    /// The step errored before reaching a verdict
    Error(SondeoError),
}

impl Observed {
    fn matches(&self, expect: Expect) -> bool {
        match (self, expect) {
            (Self::Report(report), Expect::Pass) => report.passed,
            (Self::Report(report), Expect::Success) => report.verdict.is_success(),
            (Self::Report(report), Expect::Failure) => report.verdict.is_failure(),
            (Self::Report(report), Expect::Unknown) => report.verdict.is_unknown(),
            (Self::Report(report), Expect::Rejected) => !report.passed,
            (_, Expect::Any)
            | (Self::Done, Expect::Pass | Expect::Success)
            | (Self::Error(_), Expect::Error) => true,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Report(report) => report.verdict.to_string(),
            Self::Done => "done".to_string(),
            Self::Error(err) => format!("error ({err})"),
        }
    }
}

/// Result of one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Suite name
    pub suite: String,
    /// Case name
    pub case: String,
    /// Step action
    pub action: String,
    /// Expected outcome
    pub expected: Expect,
    /// Observed outcome, e.g. `failure (error banner: ...)`
    pub observed: String,
    /// Whether the observation matched the expectation
    pub passed: bool,
    /// Operation record, when the step ran an operation
    pub report: Option<OperationReport>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// Aggregated results of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Case results, in execution order
    pub cases: Vec<CaseResult>,
    /// Cases left out by the filter or by fail-fast
    pub skipped: usize,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl Default for RunResults {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            cases: Vec::new(),
            skipped: 0,
            duration_ms: 0,
        }
    }
}

impl RunResults {
    /// Create new empty results
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passed cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }

    /// Number of failed cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed).count()
    }

    /// Number of executed cases
    #[must_use]
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    /// Check if every executed case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    /// Failed cases
    #[must_use]
    pub fn failures(&self) -> Vec<&CaseResult> {
        self.cases.iter().filter(|c| !c.passed).collect()
    }

    /// Write `results.json` into `dir`
    pub fn write_json(&self, dir: &Path) -> CliResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| CliError::report_generation(format!("{}: {e}", dir.display())))?;
        let path = dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CliError::report_generation(e.to_string()))?;
        std::fs::write(&path, json)
            .map_err(|e| CliError::report_generation(format!("{}: {e}", path.display())))?;
        Ok(path)
    }
}

fn millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Sequential suite runner over one page driver
pub struct SuiteRunner<'a> {
    config: &'a SuiteConfig,
    driver: &'a dyn PageDriver,
    reporter: ProgressReporter,
    filter: Option<String>,
}

impl std::fmt::Debug for SuiteRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("base_url", &self.config.base_url)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<'a> SuiteRunner<'a> {
    /// Create a runner
    #[must_use]
    pub fn new(config: &'a SuiteConfig, driver: &'a dyn PageDriver, cli: &CliConfig) -> Self {
        Self {
            config,
            driver,
            reporter: ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet()),
            filter: None,
        }
    }

    /// Only run cases whose name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    fn account(&self) -> Credentials {
        Credentials::new(self.config.username.as_str(), self.config.password.as_str())
    }

    /// Run every selected case of `suites`, in order
    pub async fn run(&mut self, suites: &[Suite]) -> RunResults {
        let start = Instant::now();
        let mut results = RunResults::new();
        let filter = self.filter.as_deref();

        let total: usize = suites.iter().map(|s| s.cases.len()).sum();
        let selected: usize = suites.iter().map(|s| s.selected(filter).count()).sum();
        results.skipped = total - selected;
        if selected == 0 {
            self.reporter.warning("No cases selected");
            return results;
        }

        let sink = ScreenshotSink::new(self.config.output_dir.join("screenshots"));
        let mut ctx = PageContext::new(self.driver, self.config.base_url.as_str())
            .with_timeouts(self.config.timeouts());
        if self.config.screenshots {
            ctx = ctx.with_diagnostics(&sink);
        }
        let account = self.account();

        self.reporter.start_progress(selected as u64, "Starting...");
        'suites: for suite in suites {
            self.reporter.header(&suite.name);
            for case in suite.selected(filter) {
                self.reporter.set_message(&case.name);
                let result = Self::run_case(&ctx, &account, suite, case).await;
                self.reporter.case(&result);
                self.reporter.increment(1);
                let failed = !result.passed;
                results.cases.push(result);
                if failed && self.config.fail_fast {
                    results.skipped += selected - results.cases.len();
                    break 'suites;
                }
            }
        }
        self.reporter.finish();

        results.duration_ms = millis(start);
        self.reporter.summary(
            results.passed(),
            results.failed(),
            results.skipped,
            start.elapsed(),
        );
        results
    }

    async fn run_case(
        ctx: &PageContext<'_>,
        account: &Credentials,
        suite: &Suite,
        case: &Case,
    ) -> CaseResult {
        let start = Instant::now();
        info!(suite = %suite.name, case = %case.name, action = case.step.action(), "running case");

        let observed = match Self::prepare(ctx, account, case).await {
            Ok(()) => match perform(ctx, account, &case.step).await {
                Ok(Some(report)) => Observed::Report(report),
                Ok(None) => Observed::Done,
                Err(err) => Observed::Error(err),
            },
            Err(err) => Observed::Error(err),
        };
        let passed = observed.matches(case.expect);
        if !passed {
            warn!(case = %case.name, expected = %case.expect, observed = %observed.describe(), "case failed");
        }

        CaseResult {
            suite: suite.name.clone(),
            case: case.name.clone(),
            action: case.step.action().to_string(),
            expected: case.expect,
            observed: observed.describe(),
            passed,
            report: match observed {
                Observed::Report(report) => Some(report),
                Observed::Done | Observed::Error(_) => None,
            },
            duration_ms: millis(start),
        }
    }

    /// Log in with the configured account when the case needs a session
    async fn prepare(ctx: &PageContext<'_>, account: &Credentials, case: &Case) -> SondeoResult<()> {
        if !case.logs_in_first() {
            return Ok(());
        }
        let login = LoginPage::new(ctx);
        login.open().await?;
        if login.is_logged_in().await {
            debug!("session already open");
            return Ok(());
        }
        require_passed(&login.login(account).await?)
    }
}

/// Perform one step; navigation-only steps return `None`
async fn perform(
    ctx: &PageContext<'_>,
    account: &Credentials,
    step: &Step,
) -> SondeoResult<Option<OperationReport>> {
    match step {
        Step::Login { credentials } => {
            let page = LoginPage::new(ctx);
            page.open().await?;
            if page.is_logged_in().await {
                page.logout().await?;
                page.open().await?;
            }
            page.login(credentials.as_ref().unwrap_or(account))
                .await
                .map(Some)
        }
        Step::Logout => {
            LoginPage::new(ctx).logout().await?;
            Ok(None)
        }
        Step::CreateIndividualMember { data } => {
            let page = MemberPage::new(ctx);
            page.open().await?;
            page.create_individual_member(data).await.map(Some)
        }
        Step::CreateCorporateMember { data } => {
            let page = MemberPage::new(ctx);
            page.open().await?;
            page.create_corporate_member(data).await.map(Some)
        }
        Step::CreateThirdParty { data } => {
            let page = ThirdPartyPage::new(ctx);
            page.open().await?;
            page.create_third_party(data).await.map(Some)
        }
        Step::EditMemberType { type_id, data } => {
            let page = MemberTypePage::new(ctx);
            page.open(*type_id).await?;
            page.edit_member_type(data).await.map(Some)
        }
        Step::CreateProduct { data } => {
            let page = ProductPage::new(ctx);
            page.open().await?;
            page.create_product(data).await.map(Some)
        }
        Step::DeleteProduct { product, stock } => {
            delete_product(ctx, product, stock.as_ref()).await.map(Some)
        }
        Step::CorrectStock { product_id, data } => {
            let page = StockPage::new(ctx);
            page.open_correction(*product_id).await?;
            page.correct_stock(data).await.map(Some)
        }
        Step::CreateWarehouse { data } => {
            let page = StockPage::new(ctx);
            page.open_new_warehouse().await?;
            page.create_warehouse(data).await.map(Some)
        }
        Step::EditWarehouse { warehouse_id, data } => {
            let page = StockPage::new(ctx);
            page.open_warehouse_edit(*warehouse_id).await?;
            page.edit_warehouse(data).await.map(Some)
        }
    }
}

fn require_passed(report: &OperationReport) -> SondeoResult<()> {
    if report.passed {
        Ok(())
    } else {
        Err(SondeoError::OperationFailed {
            operation: report.operation.clone(),
            verdict: report.verdict.to_string(),
        })
    }
}

/// Create the product, record the stock entry when given, then delete it.
/// Only the deletion's report is returned; the setup operations must pass.
async fn delete_product(
    ctx: &PageContext<'_>,
    product: &ProductData,
    stock: Option<&StockMovement>,
) -> SondeoResult<OperationReport> {
    let page = ProductPage::new(ctx);
    page.open().await?;
    require_passed(&page.create_product(product).await?)?;
    let product_id = page
        .current_id()
        .await?
        .ok_or_else(|| SondeoError::page("no product id after creation"))?;
    debug!(product_id, "product created");

    if let Some(movement) = stock {
        let stock_page = StockPage::new(ctx);
        stock_page.open_correction(Some(product_id)).await?;
        require_passed(&stock_page.correct_stock(movement).await?)?;
    }

    page.open_card(product_id).await?;
    page.delete_product().await
}
