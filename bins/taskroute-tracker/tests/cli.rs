//! CLI smoke tests
//!
//! None of these reach the network: they stop at argument parsing,
//! configuration loading or input validation.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn tracker() -> Command {
    cargo_bin_cmd!("taskroute-tracker")
}

/// Empty config file in a fresh directory, so no user config is picked up
fn empty_config() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskroute.toml");
    fs::write(&path, "").unwrap();
    (dir, path)
}

#[test]
fn test_help_lists_commands() {
    tracker()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("nearest"));
}

#[test]
fn test_version() {
    tracker()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_format_rejected() {
    tracker()
        .args(["--format", "xml", "snapshot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("xml"));
}

#[test]
fn test_select_must_be_numeric() {
    tracker().args(["watch", "--select", "abc"]).assert().failure();
}

#[test]
fn test_nearest_limit_must_be_positive() {
    tracker()
        .args(["nearest", "--lat", "14.5", "--lng", "121.0", "--limit", "0"])
        .assert()
        .failure();
}

#[test]
fn test_nearest_rejects_out_of_range_coordinate() {
    let (dir, config) = empty_config();
    tracker()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["nearest", "--lat", "95.0", "--lng", "-200.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Invalid coordinate"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    tracker()
        .current_dir(dir.path())
        .args(["--config", "does-not-exist.toml", "snapshot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_malformed_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("taskroute.toml");
    fs::write(&path, "[feed\nurl = ").unwrap();

    tracker()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&path)
        .arg("snapshot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
