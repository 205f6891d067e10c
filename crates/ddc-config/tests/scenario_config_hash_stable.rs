//! Config hash stability.
//!
//! Success criteria:
//! - identical inputs hash identically
//! - reordering keys within a document does not change the hash
//! - different values produce different hashes
//! - overlays take effect and hash stably
use ddc_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE_YAML: &str = r#"
costs:
  commission_bps: 1.0
  slippage_bps: 2.0
walk_forward:
  train_years: 8
  val_years: 2
  holdout_start: "2022-01-01"
constraints:
  dd_cap: -0.20
  min_exposure: 60.0
"#;

const BASE_YAML_REORDERED: &str = r#"
constraints:
  min_exposure: 60.0
  dd_cap: -0.20
walk_forward:
  holdout_start: "2022-01-01"
  val_years: 2
  train_years: 8
costs:
  slippage_bps: 2.0
  commission_bps: 1.0
"#;

const OVERLAY_YAML: &str = r#"
constraints:
  dd_cap: -0.15
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(
        a.config_hash, b.config_hash,
        "key order in the source must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_and_keeps_siblings() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let cap = loaded
        .config_json
        .pointer("/constraints/dd_cap")
        .and_then(|v| v.as_f64())
        .unwrap();
    assert!((cap + 0.15).abs() < 1e-12);
    let exposure = loaded
        .config_json
        .pointer("/constraints/min_exposure")
        .and_then(|v| v.as_f64())
        .unwrap();
    assert!((exposure - 60.0).abs() < 1e-12);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn files_hash_like_strings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let from_files = load_layered_yaml(&[
        base.to_str().unwrap(),
        overlay.to_str().unwrap(),
    ])
    .unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}
