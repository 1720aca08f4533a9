//! CLI interface smoke tests
//!
//! These exercise argument handling and the paths that fail before any
//! network traffic happens. Actual orchestration is covered by
//! orchestrator_tests against a mock engine.

use assert_cmd::Command;
use predicates::prelude::*;

/// A command with config and credential environment isolated
fn cmd(config_home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pluct-transcribe").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("PLUCT_USER_JWT")
        .env_remove("PLUCT_ENGINE_URL");
    cmd
}

#[test]
fn help_shows_usage() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--tier"));
}

#[test]
fn version_prints_crate_version() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pluct-transcribe"));
}

#[test]
fn missing_url_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No video URL"));
}

#[test]
fn invalid_url_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("definitely not a url")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid video URL"));
}

#[test]
fn unknown_tier_is_rejected_by_clap() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["https://example.com/v1", "--tier", "turbo"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn missing_credential_fails_before_any_network_call() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("https://example.com/v1")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Missing user credential"));
}

#[test]
fn config_path_prints_xdg_location() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pluct-transcribe"));
}

#[test]
fn config_init_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir).args(["config", "init"]).assert().success();

    cmd(&dir)
        .args(["config", "set", "poll_interval_secs", "5"])
        .assert()
        .success();

    cmd(&dir)
        .args(["config", "get", "poll_interval_secs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["config", "set", "api_key", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key"));
}
