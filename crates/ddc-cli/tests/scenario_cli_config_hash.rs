//! `ddc config-hash` prints a stable hash and the canonical JSON.
//!
//! Success criteria:
//! - first line is `config_hash=<64 hex>`
//! - layering an override changes the hash
//! - a missing file fails with the path in the message
use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn ddc() -> Command {
    Command::cargo_bin("ddc").unwrap()
}

fn hash_line(out: &[u8]) -> String {
    String::from_utf8_lossy(out)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn prints_hash_and_canonical_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, "constraints:\n  dd_cap: -0.2\n").unwrap();
    std::fs::write(&overlay, "constraints:\n  dd_cap: -0.1\n").unwrap();

    let one = ddc()
        .args(["config-hash", base.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"constraints":{"dd_cap":-0.2}}"#))
        .get_output()
        .stdout
        .clone();
    let line = hash_line(&one);
    let hash = line.strip_prefix("config_hash=").unwrap();
    assert_eq!(hash.len(), 64);

    let two = ddc()
        .args([
            "config-hash",
            base.to_str().unwrap(),
            overlay.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_ne!(line, hash_line(&two));
}

#[test]
fn missing_file_fails() {
    ddc()
        .args(["config-hash", "/nonexistent/ddc.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/ddc.yaml"));
}
