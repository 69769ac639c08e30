//! CLI integration tests

use std::fs;
use std::process::Command;

fn casectl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_casectl"))
}

const FOREST: &str = r#"{
    "version": "rf-cli-test",
    "n_features": 6,
    "feature_names": ["age", "escalated", "resolution_days",
                      "case_type_Family Law", "case_type_Criminal", "complexity_Medium"],
    "classes": ["Not Resolved", "Resolved"],
    "trees": [{
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [1, -2, -2],
        "threshold": [0.5, -2.0, -2.0],
        "value": [[4.0, 4.0], [1.0, 3.0], [3.0, 1.0]]
    }]
}"#;

fn case_args() -> [&'static str; 10] {
    [
        "--case-type",
        "Family Law",
        "--complexity",
        "Medium",
        "--client-age",
        "35",
        "--income-level",
        "Medium",
        "--days-open",
        "30",
    ]
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = casectl()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Case Outcome Predictor"),
        "Should show app name"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("model"), "Should show model command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("resolve"), "Should show resolve command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = casectl()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("casectl"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = casectl()
        .args(["predict", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--case-type"));
    assert!(stdout.contains("--income-level"));
    assert!(stdout.contains("--escalated"));
}

#[test]
fn test_resolve_help() {
    let output = casectl()
        .args(["resolve", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--model"));
    assert!(stdout.contains("--checksum"));
}

#[test]
fn test_missing_argument() {
    let output = casectl()
        .args(["predict", "--case-type", "Criminal"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Should fail without required fields");
}

#[test]
fn test_invalid_command() {
    let output = casectl()
        .arg("invalid-command")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_resolve_offline_json() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("case_forest.json");
    fs::write(&model, FOREST).unwrap();

    let output = casectl()
        .env("HOME", dir.path())
        .args(["--format", "json", "resolve", "--predict", "--model"])
        .arg(&model)
        .args(case_args())
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "resolve should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["vector"], serde_json::json!([35.0, 0.0, 30.0, 1.0, 0.0, 1.0]));
    assert_eq!(body["model_version"], "rf-cli-test");
    assert_eq!(body["prediction"]["prediction"], "Resolved");

    let unmatched: Vec<&str> = body["report"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["outcome"] == "unmatched")
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(unmatched, vec!["client_income_level"]);
}

#[test]
fn test_resolve_rejects_bad_checksum() {
    let dir = tempfile::TempDir::new().unwrap();
    let model = dir.path().join("case_forest.json");
    fs::write(&model, FOREST).unwrap();

    let output = casectl()
        .env("HOME", dir.path())
        .args(["resolve", "--checksum", "00ff", "--model"])
        .arg(&model)
        .args(case_args())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Checksum mismatch"));
}
