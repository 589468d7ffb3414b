//! Runs the `llmsweep` binary once per case from an empty working directory.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn llmsweep(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_llmsweep"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("LLMSWEEP_CONFIG")
        .env_remove("LLMSWEEP_RESULTS_DIR")
        .env("RUST_LOG", "error")
        .output()
        .expect("llmsweep binary should start")
}

#[test]
fn test_unknown_target_prints_usage_and_fails() {
    let dir = TempDir::new().unwrap();
    let out = llmsweep(&dir, &["everything"]);

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unknown target `everything`"), "{stderr}");
    assert!(stderr.contains("Usage:"), "{stderr}");

    // Nothing ran, so no results directory was created.
    assert!(!dir.path().join("results").exists());
}

#[test]
fn test_list_prints_suites_and_tests() {
    let dir = TempDir::new().unwrap();
    let out = llmsweep(&dir, &["list"]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("basic (1)"), "{stdout}");
    assert!(stdout.contains("high-load (5)"), "{stdout}");
    assert!(stdout.contains("concurrency-1000.json"), "{stdout}");
}

#[test]
fn test_analyze_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let out = llmsweep(&dir, &["analyze", "no-such-results"]);

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no-such-results"), "{stderr}");
}

#[test]
fn test_compare_without_metrics_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let metrics = dir.path().join("metrics-data.json");
    fs::write(
        &metrics,
        serde_json::json!({"metadata": {}, "metrics": {}}).to_string(),
    )
    .unwrap();

    let out = llmsweep(&dir, &["compare", "metrics-data.json"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("comparison").exists());
}
