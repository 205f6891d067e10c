//! Unused-key guard.
//!
//! Success criteria:
//! - unused keys are reported under `Warn` without an error
//! - unused keys are an error under `Fail`
//! - keys under consumed sections are never flagged
//! - unused pointers come out sorted
use ddc_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let yaml = r#"
constraints:
  dd_cap: -0.2
legacy:
  foo: 123
  bar: 456
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/legacy/bar".to_string(), "/legacy/foo".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = r#"
constraint:
  dd_cap: -0.2
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("CONFIG_UNUSED_KEYS"));
    assert!(msg.contains("/constraint/dd_cap"));
}

#[test]
fn consumed_sections_cover_nested_keys_and_arrays() {
    let yaml = r#"
costs:
  commission_bps: 0.5
risk_scales: [0.5, 1.0]
strategies: ["F_hysteresis_regime"]
optimizer:
  objective: Sharpe
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
