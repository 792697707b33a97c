//! End-to-end tests for the `integrity` binary
//!
//! Each test runs the compiled binary against a fresh database file.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn integrity(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_integrity"))
        .env_remove("RUST_LOG")
        .env("INTEGRITY_LOG_LEVEL", "error")
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("failed to run integrity binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn test_submit_then_query() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");

    let out = integrity(&db, &["--identity", "a1b2", "submit", "batch1", "0", "abc123"]);
    assert!(out.status.success());
    assert!(stdout(&out).is_empty());

    let out = integrity(&db, &["--identity", "a1b2", "submit", "batch1", "1", "def456"]);
    assert!(out.status.success());

    let out = integrity(&db, &["query", "a1b2"]);
    assert!(out.status.success());

    let records: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(
        records,
        serde_json::json!([
            {"sender": "a1b2", "bucket": "batch1", "index": "0", "hash": "abc123"},
            {"sender": "a1b2", "bucket": "batch1", "index": "1", "hash": "def456"},
        ])
    );
}

#[test]
fn test_whoami_prints_sender_token() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");

    let out = integrity(&db, &["--identity", "DEADbeef", "whoami"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "deadbeef");
}

#[test]
fn test_query_unknown_sender_fails() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");

    let out = integrity(&db, &["query", "ffff"]);
    assert!(!out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("No variable by the name ffff exists"));
    assert!(!stderr.contains("\"code\""));
}

#[test]
fn test_submit_without_identity_fails() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");

    let out = integrity(&db, &["submit", "b", "0", "h"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains(r#""code":300"#));
}

#[test]
fn test_non_hex_identity_rejected() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");

    let out = integrity(&db, &["--identity", "not-hex", "whoami"]);
    assert!(!out.status.success());
}
