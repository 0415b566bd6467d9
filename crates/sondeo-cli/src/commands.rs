//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Sondeo: run resilient end-to-end suites against a Dolibarr ERP
#[derive(Parser, Debug)]
#[command(name = "sondeo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run suites against a live ERP
    Run(RunArgs),

    /// Parse and check suite files without a browser
    Validate(ValidateArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Settings shared by every command that resolves a configuration
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Config file (defaults to ./sondeo.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// ERP base URL
    #[arg(long, env = "SONDEO_BASE_URL")]
    pub base_url: Option<String>,

    /// Login name
    #[arg(long, env = "SONDEO_USERNAME")]
    pub username: Option<String>,

    /// Password
    #[arg(long, env = "SONDEO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Parallel workers (only 1 is supported)
    #[arg(short = 'j', long, env = "SONDEO_WORKERS")]
    pub workers: Option<usize>,

    /// Output directory for results and screenshots
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl SettingsArgs {
    /// Values to layer over the config file
    #[must_use]
    pub fn overrides(&self, fail_fast: bool) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            headed: self.headed,
            workers: self.workers,
            fail_fast,
            output: self.output.clone(),
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite files or directories of `.yaml` suites
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,

    /// Only run cases whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop at the first failing case
    #[arg(long)]
    pub fail_fast: bool,

    /// Shared settings
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Suite files or directories of `.yaml` suites
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the resolved configuration
    #[arg(long)]
    pub defaults: bool,

    /// Shared settings
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
