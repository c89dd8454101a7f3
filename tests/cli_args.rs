//! Integration tests for the metacache binary
//!
//! Runs the real executable against temporary cache directories. The GitHub
//! CLI is disabled and the HTTP endpoint points at a closed local port, so no
//! test touches the network.

use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;

use chrono::Utc;
use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_metacache"))
        .args(args)
        .env_remove("GITHUB_TOKEN")
        .env_remove("METACACHE_DIR")
        .env_remove("METACACHE_MAX_AGE")
        .output()
        .expect("Failed to execute metacache")
}

/// URL on a local port with nothing listening
fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/meta")
}

fn run_offline(cache_dir: &Path, extra: &[&str]) -> std::process::Output {
    let url = closed_url();
    let dir = cache_dir.to_string_lossy().into_owned();
    let mut args = vec![
        "--cache-dir",
        dir.as_str(),
        "--no-gh",
        "--url",
        url.as_str(),
        "--timeout",
        "5",
    ];
    args.extend_from_slice(extra);
    run_cli(&args)
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("metacache"), "Help should mention metacache");
    assert!(stdout.contains("--max-age"), "Help should mention --max-age");
    assert!(stdout.contains("--write-policy"), "Help should mention --write-policy");
}

#[test]
fn test_invalid_write_policy_prints_error_and_exits() {
    let output = run_cli(&["--write-policy", "sometimes"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sometimes"), "Should name the bad value: {stderr}");
}

#[test]
fn test_fresh_cache_is_reused_without_fetching() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("meta.json"), r#"{"domains":{"actions":[]}}"#).unwrap();
    let written_at = Utc::now().timestamp() - 100;
    fs::write(
        temp_dir.path().join("meta-timestamp.txt"),
        written_at.to_string(),
    )
    .unwrap();

    let output = run_offline(temp_dir.path(), &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Using cached"), "{stdout}");
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("meta-timestamp.txt")).unwrap(),
        written_at.to_string()
    );
}

#[test]
fn test_no_cache_and_failed_fetch_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let cache_dir = temp_dir.path().join("cache");

    let output = run_offline(&cache_dir, &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(cache_dir.is_dir(), "Cache directory should be created");
    assert!(!cache_dir.join("meta-timestamp.txt").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no cached data"), "{stderr}");
}

#[test]
fn test_expired_cache_and_failed_fetch_falls_back_to_stale_data() {
    let temp_dir = TempDir::new().unwrap();
    let body = r#"{"domains":{"actions":["a"]}}"#;
    let written_at = Utc::now().timestamp() - 7200;
    fs::write(temp_dir.path().join("meta.json"), body).unwrap();
    fs::write(
        temp_dir.path().join("meta-timestamp.txt"),
        written_at.to_string(),
    )
    .unwrap();

    let output = run_offline(temp_dir.path(), &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Warning"), "{stdout}");
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("meta.json")).unwrap(),
        body
    );
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("meta-timestamp.txt")).unwrap(),
        written_at.to_string()
    );
}

#[test]
fn test_unwritable_cache_dir_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, "file, not a directory").unwrap();

    let output = run_offline(&blocker.join("cache"), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cache directory"), "{stderr}");
}
