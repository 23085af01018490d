//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn cli_reports_version() {
    let mut cmd = cargo_bin_cmd!("stevedore");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("stevedore "));
}

#[test]
fn cli_without_subcommand_prints_help_and_fails() {
    let mut cmd = cargo_bin_cmd!("stevedore");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn apply_with_missing_manifest_exits_with_error() {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
    let manifest = dir.path().join("absent.toml");

    let mut cmd = cargo_bin_cmd!("stevedore");
    cmd.current_dir(dir.path())
        .arg("apply")
        .arg(&manifest)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    let mut cmd = cargo_bin_cmd!("stevedore");
    cmd.arg("provision")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
