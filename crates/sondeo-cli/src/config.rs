//! CLI configuration
//!
//! Two layers live here: [`CliConfig`] holds presentation settings derived
//! from the global flags, [`SuiteConfig`] holds everything a suite run needs
//! to reach and drive the ERP. Suite settings are resolved once at startup as
//! defaults < `sondeo.yaml` < `SONDEO_*` environment < command-line flags.

use serde::{Deserialize, Serialize};
use sondeo::{
    DriverConfig, Timeouts, DEFAULT_CANDIDATE_TIMEOUT_MS, DEFAULT_ERROR_SIGNAL_TIMEOUT_MS,
    DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SIGNAL_TIMEOUT_MS,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "sondeo.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Check if debug mode
    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }

    /// Log level used when `SONDEO_LOG` is not set
    #[must_use]
    pub const fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Presentation settings from the global flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

// =============================================================================
// Suite configuration
// =============================================================================

/// Wait bounds in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    /// Per-candidate wait during resolution
    pub candidate_ms: u64,
    /// Wait for each success signal
    pub signal_ms: u64,
    /// Wait for each error signal
    pub error_signal_ms: u64,
    /// Polling interval
    pub poll_interval_ms: u64,
    /// Navigation bound
    pub navigation_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            candidate_ms: DEFAULT_CANDIDATE_TIMEOUT_MS,
            signal_ms: DEFAULT_SIGNAL_TIMEOUT_MS,
            error_signal_ms: DEFAULT_ERROR_SIGNAL_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            navigation_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl TimeoutsConfig {
    /// As library timeouts
    #[must_use]
    pub const fn to_timeouts(&self) -> Timeouts {
        Timeouts {
            candidate: Duration::from_millis(self.candidate_ms),
            signal: Duration::from_millis(self.signal_ms),
            error_signal: Duration::from_millis(self.error_signal_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            navigation: Duration::from_millis(self.navigation_ms),
        }
    }
}

/// Browser window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Everything a suite run needs, read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// ERP base URL
    pub base_url: String,
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
    /// Run the browser without a window
    pub headless: bool,
    /// Parallel workers; the ERP instance is shared state, so only 1 is valid
    pub workers: usize,
    /// Wait bounds
    pub timeouts: TimeoutsConfig,
    /// Browser window size
    pub viewport: ViewportConfig,
    /// Chromium binary override
    pub chromium_path: Option<String>,
    /// Disable the Chromium sandbox (containers)
    pub no_sandbox: bool,
    /// Where results and screenshots go
    pub output_dir: PathBuf,
    /// Capture a screenshot when an operation does not succeed
    pub screenshots: bool,
    /// Stop at the first failing case
    pub fail_fast: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            headless: true,
            workers: 1,
            timeouts: TimeoutsConfig::default(),
            viewport: ViewportConfig::default(),
            chromium_path: None,
            no_sandbox: false,
            output_dir: PathBuf::from("target/sondeo"),
            screenshots: true,
            fail_fast: false,
        }
    }
}

/// Values from the environment and the command line; `None` keeps the lower
/// layer's value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// ERP base URL
    pub base_url: Option<String>,
    /// Login name
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Show the browser window
    pub headed: bool,
    /// Parallel workers
    pub workers: Option<usize>,
    /// Stop at the first failing case
    pub fail_fast: bool,
    /// Output directory
    pub output: Option<PathBuf>,
}

impl SuiteConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> CliResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| CliError::config(e.to_string()))
    }

    /// Load a config file
    pub fn load(path: &Path) -> CliResult<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("cannot read {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loading config file");
        Self::from_yaml_str(&yaml)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))
    }

    /// Load `path`, or `sondeo.yaml` from the working directory when it
    /// exists, or fall back to defaults
    pub fn discover(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment and command-line values on top of this config
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(ref url) = overrides.base_url {
            self.base_url.clone_from(url);
        }
        if let Some(ref username) = overrides.username {
            self.username.clone_from(username);
        }
        if let Some(ref password) = overrides.password {
            self.password.clone_from(password);
        }
        if overrides.headed {
            self.headless = false;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.fail_fast {
            self.fail_fast = true;
        }
        if let Some(ref output) = overrides.output {
            self.output_dir.clone_from(output);
        }
        self
    }

    /// Reject settings the runner cannot honor
    pub fn validate(&self) -> CliResult<()> {
        if self.workers != 1 {
            return Err(CliError::config(format!(
                "workers = {}: suites share one ERP instance and must run with a single worker",
                self.workers
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CliError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.username.trim().is_empty() {
            return Err(CliError::config("username must not be empty"));
        }
        Ok(())
    }

    /// Library timeouts
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts.to_timeouts()
    }

    /// Browser launch settings
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        let mut config = DriverConfig::new()
            .headless(self.headless)
            .viewport(self.viewport.width, self.viewport.height)
            .navigation_timeout(Duration::from_millis(self.timeouts.navigation_ms));
        if let Some(ref path) = self.chromium_path {
            config = config.executable_path(path.clone());
        }
        if self.no_sandbox {
            config = config.no_sandbox();
        }
        config
    }

    /// YAML rendering with the password masked
    pub fn to_display_yaml(&self) -> CliResult<String> {
        let mut shown = self.clone();
        if !shown.password.is_empty() {
            shown.password = "********".to_string();
        }
        serde_yaml_ng::to_string(&shown).map_err(|e| CliError::config(e.to_string()))
    }
}
