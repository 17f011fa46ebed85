//! End-to-end tests driving the `knowbot` binary in a sandbox.
//!
//! The default test configuration leaves the embedding provider disabled,
//! which exercises every pre-embedding failure path (validation, document
//! parsing, lookup classification) plus the all-or-nothing ingestion
//! contract, without any network access.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn knowbot_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("knowbot");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/knowbot.sqlite"

[server]
bind = "127.0.0.1:7450"
"#,
        root.display()
    );

    let config_path = config_dir.join("knowbot.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_knowbot(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = knowbot_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run knowbot binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_knowbot(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_knowbot(&config_path, &["init"]);
    let (_, _, success2) = run_knowbot(&config_path, &["init"]);
    assert!(success1);
    assert!(success2);
}

#[test]
fn test_create_manual_missing_name_persists_nothing() {
    let (tmp, config_path) = setup_test_env();
    run_knowbot(&config_path, &["init"]);

    let manifest = tmp.path().join("org.json");
    fs::write(&manifest, r#"{ "name": "", "industry": "Retail" }"#).unwrap();

    let (_, stderr, success) = run_knowbot(
        &config_path,
        &["create", "manual", "--file", manifest.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("invalid input"), "stderr: {}", stderr);

    let (stdout, _, success) = run_knowbot(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No organizations."));
}

#[test]
fn test_create_without_embedding_provider_persists_nothing() {
    let (tmp, config_path) = setup_test_env();
    run_knowbot(&config_path, &["init"]);

    let manifest = tmp.path().join("org.json");
    fs::write(
        &manifest,
        r#"{ "name": "Acme", "industry": "Retail", "employees": [{ "name": "Jo", "role": "CEO" }] }"#,
    )
    .unwrap();

    let (_, stderr, success) = run_knowbot(
        &config_path,
        &["create", "manual", "--file", manifest.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("embedding"), "stderr: {}", stderr);

    let (stdout, _, _) = run_knowbot(&config_path, &["list"]);
    assert!(stdout.contains("No organizations."));
}

#[test]
fn test_create_auto_rejects_garbage_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_knowbot(&config_path, &["init"]);

    let pdf = tmp.path().join("bad.pdf");
    fs::write(&pdf, b"definitely not a pdf").unwrap();

    let (_, stderr, success) = run_knowbot(
        &config_path,
        &[
            "create",
            "auto",
            "--name",
            "Acme",
            "--file",
            pdf.to_str().unwrap(),
        ],
    );
    assert!(!success);
    assert!(stderr.contains("unsupported document"), "stderr: {}", stderr);
}

#[test]
fn test_ask_unknown_organization() {
    let (_tmp, config_path) = setup_test_env();
    run_knowbot(&config_path, &["init"]);

    let (_, stderr, success) = run_knowbot(&config_path, &["ask", "no-such-org", "Who is the CEO?"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_ask_empty_question_rejected_first() {
    let (_tmp, config_path) = setup_test_env();
    run_knowbot(&config_path, &["init"]);

    // Rejected before the organization lookup or any provider call.
    let (_, stderr, success) = run_knowbot(&config_path, &["ask", "no-such-org", "   "]);
    assert!(!success);
    assert!(stderr.contains("invalid query"), "stderr: {}", stderr);
}

#[test]
fn test_history_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_knowbot(&config_path, &["init"]);

    let (stdout, _, success) = run_knowbot(&config_path, &["history", "no-such-org"]);
    assert!(success);
    assert!(stdout.contains("No interactions."));
}

#[test]
fn test_rejects_invalid_config() {
    let (tmp, _) = setup_test_env();
    let bad_config = tmp.path().join("bad.toml");
    fs::write(
        &bad_config,
        r#"[db]
path = "data/knowbot.sqlite"

[server]
bind = "127.0.0.1:7450"

[retrieval]
top_k = 0
"#,
    )
    .unwrap();

    let binary = knowbot_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(bad_config.to_str().unwrap())
        .arg("init")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
