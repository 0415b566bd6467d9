//! Smoke tests for the sondeo CLI
//!
//! These exercise argument parsing, configuration layering and suite
//! validation through the real binary. Nothing here starts a browser.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the sondeo binary, isolated from the caller's env
fn sondeo(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sondeo").expect("sondeo binary should exist");
    cmd.current_dir(dir.path())
        .env_remove("SONDEO_BASE_URL")
        .env_remove("SONDEO_USERNAME")
        .env_remove("SONDEO_PASSWORD")
        .env_remove("SONDEO_WORKERS")
        .env_remove("SONDEO_LOG");
    cmd
}

const LOGIN_SUITE: &str = r"
name: login
cases:
  - name: admin can log in
    step:
      action: login
  - name: wrong password is rejected
    expect: failure
    step:
      action: login
      credentials: { usuario: admin, contrasena: wrong }
";

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dolibarr"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir).assert().failure();
}

#[test]
fn test_run_subcommand_help() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("SONDEO_BASE_URL"))
        .stdout(predicate::str::contains("--fail-fast"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_good_suite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("login.yaml"), LOGIN_SUITE).unwrap();
    sondeo(&dir)
        .args(["--color", "never", "validate", "login.yaml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("PASS"))
        .stderr(predicate::str::contains("2 cases"));
}

#[test]
fn test_bundled_dolibarr_suites_are_valid() {
    let dir = TempDir::new().unwrap();
    let suites = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../suites/dolibarr");
    sondeo(&dir)
        .args(["--color", "never", "validate"])
        .arg(suites)
        .assert()
        .success()
        .stderr(predicate::str::contains("member types"))
        .stderr(predicate::str::contains("FAIL").not());
}

#[test]
fn test_validate_bad_suite_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("broken.yaml"),
        "name: broken\ncases:\n  - name: a\n    step: { action: fly }\n",
    )
    .unwrap();
    sondeo(&dir)
        .args(["--color", "never", "validate", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid suite"))
        .stderr(predicate::str::contains("1 of 1 suite files are invalid"));
}

#[test]
fn test_validate_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir)
        .args(["validate", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yaml"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_shows_defaults_with_masked_password() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://localhost:8080"))
        .stdout(predicate::str::contains("********"));
}

#[test]
fn test_config_file_then_env_then_flags() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sondeo.yaml"),
        "base_url: http://file.test\nusername: from-file\npassword: from-file\n",
    )
    .unwrap();
    sondeo(&dir)
        .env("SONDEO_USERNAME", "from-env")
        .args(["config", "--password", "from-flag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://file.test"))
        .stdout(predicate::str::contains("username: from-env"))
        .stdout(predicate::str::contains("from-flag").not());
}

#[test]
fn test_config_rejects_parallel_workers() {
    let dir = TempDir::new().unwrap();
    sondeo(&dir)
        .args(["config", "--workers", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("single worker"));
}

#[test]
fn test_run_rejects_bad_config_before_browser() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("login.yaml"), LOGIN_SUITE).unwrap();
    sondeo(&dir)
        .args(["run", "login.yaml", "--base-url", "localhost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url must be an http(s) URL"));
}
