//! Sondeo CLI: run Dolibarr end-to-end suites
//!
//! ## Usage
//!
//! ```bash
//! sondeo run suites/dolibarr                  # Run every suite in a directory
//! sondeo run suites/dolibarr/members.yaml -f  empty --fail-fast
//! sondeo validate suites/dolibarr             # Parse suites without a browser
//! sondeo config                               # Show the resolved configuration
//! ```

use clap::Parser;
use sondeo_cli::{
    collect_suite_files, load_suites, logging, Cli, CliConfig, CliError, CliResult, ColorChoice,
    Commands, ConfigArgs, ProgressReporter, RunArgs, RunResults, SettingsArgs, Suite, SuiteConfig,
    ValidateArgs, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    logging::init(config.verbosity);

    match cli.command {
        Commands::Run(args) => run_suites(&config, &args),
        Commands::Validate(args) => run_validate(&config, &args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

/// defaults < file < env < flags, then validated
fn resolve_suite_config(settings: &SettingsArgs, fail_fast: bool) -> CliResult<SuiteConfig> {
    let config = SuiteConfig::discover(settings.config.as_deref())?
        .with_overrides(&settings.overrides(fail_fast));
    config.validate()?;
    Ok(config)
}

fn run_suites(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let suite_config = resolve_suite_config(&args.settings, args.fail_fast)?;
    let suites = load_suites(&args.suites)?;
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.info(&format!(
        "{} suite(s) against {}",
        suites.len(),
        suite_config.base_url
    ));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let results = runtime.block_on(execute(config, &suite_config, &suites, args.filter.clone()))?;

    let path = results.write_json(&suite_config.output_dir)?;
    reporter.info(&format!("Results written to {}", path.display()));

    if results.all_passed() {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{} of {} cases failed",
            results.failed(),
            results.total()
        )))
    }
}

#[cfg(feature = "browser")]
async fn execute(
    config: &CliConfig,
    suite_config: &SuiteConfig,
    suites: &[Suite],
    filter: Option<String>,
) -> CliResult<RunResults> {
    let driver = sondeo::ChromiumDriver::launch(suite_config.driver_config()).await?;
    let results = sondeo_cli::SuiteRunner::new(suite_config, &driver, config)
        .with_filter(filter)
        .run(suites)
        .await;
    if let Err(err) = driver.close().await {
        tracing::warn!(error = %err, "browser did not shut down cleanly");
    }
    Ok(results)
}

#[cfg(not(feature = "browser"))]
async fn execute(
    _config: &CliConfig,
    _suite_config: &SuiteConfig,
    _suites: &[Suite],
    _filter: Option<String>,
) -> CliResult<RunResults> {
    Err(CliError::config(
        "sondeo was built without the `browser` feature; rebuild with --features browser",
    ))
}

fn run_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let files = collect_suite_files(&args.suites)?;

    let mut invalid = 0;
    for file in &files {
        match Suite::load(file) {
            Ok(suite) => reporter.success(&format!(
                "{} ({}: {} cases)",
                file.display(),
                suite.name,
                suite.cases.len()
            )),
            Err(err) => {
                invalid += 1;
                reporter.failure(&err.to_string());
            }
        }
    }

    if invalid == 0 {
        Ok(())
    } else {
        Err(CliError::invalid_argument(format!(
            "{invalid} of {} suite files are invalid",
            files.len()
        )))
    }
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = if args.defaults {
        SuiteConfig::default()
    } else {
        resolve_suite_config(&args.settings, false)?
    };
    print!("{}", config.to_display_yaml()?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod build_config_tests {
        use super::*;

        #[test]
        fn test_build_config_default() {
            let cli = Cli::parse_from(["sondeo", "config"]);
            let config = build_config(&cli);
            assert_eq!(config.verbosity, Verbosity::Normal);
        }

        #[test]
        fn test_build_config_verbose() {
            let cli = Cli::parse_from(["sondeo", "-v", "config"]);
            assert_eq!(build_config(&cli).verbosity, Verbosity::Verbose);
        }

        #[test]
        fn test_build_config_debug() {
            let cli = Cli::parse_from(["sondeo", "-vvv", "config"]);
            assert_eq!(build_config(&cli).verbosity, Verbosity::Debug);
        }

        #[test]
        fn test_build_config_quiet_wins() {
            let cli = Cli::parse_from(["sondeo", "-q", "-v", "config"]);
            assert_eq!(build_config(&cli).verbosity, Verbosity::Quiet);
        }

        #[test]
        fn test_build_config_color() {
            let cli = Cli::parse_from(["sondeo", "--color", "always", "config"]);
            assert_eq!(build_config(&cli).color, ColorChoice::Always);
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_flags_override_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sondeo.yaml");
            std::fs::write(&path, "base_url: http://file.test\nusername: file-user\n").unwrap();
            let settings = SettingsArgs {
                config: Some(path),
                username: Some("flag-user".to_string()),
                ..SettingsArgs::default()
            };

            let config = resolve_suite_config(&settings, true).unwrap();

            assert_eq!(config.base_url, "http://file.test");
            assert_eq!(config.username, "flag-user");
            assert!(config.fail_fast);
        }

        #[test]
        fn test_parallel_workers_refused() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("sondeo.yaml");
            std::fs::write(&path, "workers: 3\n").unwrap();
            let settings = SettingsArgs {
                config: Some(path),
                ..SettingsArgs::default()
            };

            let err = resolve_suite_config(&settings, false).unwrap_err();

            assert!(matches!(err, CliError::Config { .. }));
        }
    }

    mod validate_tests {
        use super::*;
        use std::path::PathBuf;

        #[test]
        fn test_validate_reports_invalid_files() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(
                dir.path().join("ok.yaml"),
                "name: ok\ncases:\n  - name: a\n    step: { action: logout }\n",
            )
            .unwrap();
            std::fs::write(dir.path().join("bad.yaml"), "name: bad\n").unwrap();
            let config = CliConfig::new().with_verbosity(Verbosity::Quiet);
            let args = ValidateArgs {
                suites: vec![PathBuf::from(dir.path())],
            };

            let err = run_validate(&config, &args).unwrap_err();

            assert!(err.to_string().contains("1 of 2 suite files are invalid"));
        }
    }
}
