//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "rul-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Equipment RUL Predictor"),
        "Should show app name"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("retrain"), "Should show retrain command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "rul-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("rul"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "rul-cli", "--", "predict", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--zone"), "Should show zone option");
    assert!(
        stdout.contains("--equipment"),
        "Should show equipment option"
    );
}

/// Test retrain subcommand help
#[test]
fn test_retrain_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "rul-cli", "--", "retrain", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Retrain help should succeed");
    assert!(stdout.contains("--month"), "Should show month option");
    assert!(stdout.contains("--sample"), "Should show sample option");
}

/// Test that predict requires its identifiers
#[test]
fn test_predict_requires_zone_and_equipment() {
    let output = Command::new("cargo")
        .args(["run", "-p", "rul-cli", "--", "predict"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Predict without args should fail");
    assert!(
        stderr.contains("--zone") || stderr.contains("required"),
        "Should name the missing arguments"
    );
}
