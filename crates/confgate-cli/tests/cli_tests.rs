//! Exit codes and output of the `confgate` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SEVERITY_RULE: &str =
    "package main\n\ndeny \"severity is high\" {\n    input.severity == \"high\"\n}\n";

fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

fn confgate(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_confgate"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn passing_documents_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "policy/main.rules", SEVERITY_RULE);
    write(dir.path(), "ok.yaml", "severity: low\n");

    let out = confgate(dir.path(), &["test", "ok.yaml"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(
        stdout,
        "1 tests, 1 passed, 0 warnings, 0 failures, 0 exceptions\nPASS - 0/1 documents failed\n"
    );
}

#[test]
fn failing_document_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "policy/main.rules", SEVERITY_RULE);
    write(dir.path(), "bad.json", r#"{"severity":"high"}"#);

    let out = confgate(dir.path(), &["test", "bad.json", "-o", "json"]);
    assert_eq!(out.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["failed"], true);

    let out = confgate(dir.path(), &["test", "bad.json", "--no-fail"]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn invocation_errors_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "policy/main.rules", SEVERITY_RULE);
    write(dir.path(), "a.json", "{}");

    let out = confgate(dir.path(), &["test", "a.json", "-n", "ghost"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8(out.stderr).unwrap().contains("ghost"));

    let out = confgate(dir.path(), &["test", "a.json", "-p", "missing"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn undecodable_input_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "policy/main.rules", SEVERITY_RULE);
    write(dir.path(), "broken.json", "{");
    write(dir.path(), "ok.json", "{}");

    let out = confgate(dir.path(), &["test", "broken.json", "ok.json"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("ERROR - broken.json"));
    assert!(stdout.ends_with("PASS - 0/2 documents failed\n"));

    let out = confgate(dir.path(), &["test", "broken.json", "ok.json", "--fail-on-exception"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.starts_with("FAIL - broken.json"));
    assert!(stdout.ends_with("FAIL - 1/2 documents failed\n"));
}

#[test]
fn config_file_supplies_policy_location() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "rules/main.rules", SEVERITY_RULE);
    write(dir.path(), "confgate.yaml", "policy: [rules]\n");
    write(dir.path(), "bad.json", r#"{"severity":"high"}"#);

    let out = confgate(dir.path(), &["--config", "confgate.yaml", "test", "bad.json"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn parse_prints_normalized_json() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.toml", "name = \"web\"\n");

    let out = confgate(dir.path(), &["parse", "app.toml"]);
    assert_eq!(out.status.code(), Some(0));
    let parsed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(parsed[0]["document"], "app.toml");
    assert_eq!(parsed[0]["contents"]["name"], "web");
}
