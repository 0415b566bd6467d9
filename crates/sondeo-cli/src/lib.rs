//! Sondeo CLI Library
//!
//! Command-line front end for the Sondeo page-object core: configuration
//! layering, YAML suite files, the sequential suite runner and its console
//! and JSON reporting.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;
mod suite;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, RunArgs, SettingsArgs, ValidateArgs};
pub use config::{
    CliConfig, ColorChoice, ConfigOverrides, SuiteConfig, TimeoutsConfig, Verbosity,
    ViewportConfig, DEFAULT_CONFIG_FILE,
};
pub use error::{CliError, CliResult};
pub use output::{case_lines, ProgressReporter};
pub use runner::{CaseResult, RunResults, SuiteRunner, RESULTS_FILE};
pub use suite::{collect_suite_files, load_suites, Case, Expect, Step, Suite};
