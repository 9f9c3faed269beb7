//! Smoke tests of the `agportal` binary. None of them reach the listener.

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn agportal() -> Command {
    let mut cmd = Command::cargo_bin("agportal").unwrap();
    for var in [
        "AGPORTAL_CONFIG",
        "AGPORTAL_HTTP_ADDR",
        "AGPORTAL_SESSION_KEY",
        "GITHUB_KEY",
        "GITHUB_SECRET",
        "GITLAB_KEY",
        "GITLAB_SECRET",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_flags() {
    agportal()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--http-addr"))
        .stdout(contains("--provider-fake"))
        .stdout(contains("--service-url"));
}

#[test]
fn help_hides_secret_values() {
    agportal()
        .arg("--help")
        .env("GITHUB_SECRET", "do-not-print")
        .assert()
        .success()
        .stdout(contains("do-not-print").not());
}

#[test]
fn version_flag_works() {
    agportal()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("agportal"));
}

#[test]
fn missing_config_file_fails() {
    agportal()
        .args(["--config", "/nonexistent/agportal.toml"])
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}

#[test]
fn short_session_key_fails() {
    agportal()
        .args(["--session-key", "abcd"])
        .assert()
        .failure()
        .stderr(contains("session"));
}
