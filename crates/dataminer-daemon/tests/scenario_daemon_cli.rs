//! CLI flag and exit-code coverage, driven through the compiled binary
//! with `assert_cmd`.

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn version_flag_prints_version_and_exits_zero() {
    Command::cargo_bin("dataminer-daemon")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("dataminer-daemon"));
}

#[test]
fn help_flag_prints_usage_and_exits_zero() {
    Command::cargo_bin("dataminer-daemon")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("USAGE"));
}

#[test]
fn missing_config_file_fails_with_config_load_exit_code() {
    Command::cargo_bin("dataminer-daemon")
        .unwrap()
        .args(["--config", "/nonexistent/path/config.yaml"])
        .assert()
        .code(1);
}
