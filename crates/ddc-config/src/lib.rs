//! Layered YAML configuration for research runs.
//!
//! Documents are merged in order (later overrides earlier, maps merge
//! recursively), converted to JSON and hashed over their canonical form so
//! every report can name the exact configuration it ran with.

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

mod consumption;
mod research;

pub use consumption::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_PREFIXES};
pub use research::{
    OptimizerSection, ResearchConfig, WalkForwardSection, DEFAULT_STRATEGIES,
};

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml (layer {i})"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document parses as null; treat it as "no overrides".
        if !v_json.is_null() {
            merged = deep_merge(merged, v_json);
        }
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON. Object keys come out sorted (serde_json's default map is a
/// BTreeMap), so key order in the source YAML does not affect the hash.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_merge_overrides_leaves_and_keeps_siblings() {
        let a = serde_json::json!({"x": {"a": 1, "b": 2}, "y": [1, 2]});
        let b = serde_json::json!({"x": {"b": 3}, "y": [9]});
        let m = deep_merge(a, b);
        assert_eq!(m, serde_json::json!({"x": {"a": 1, "b": 3}, "y": [9]}));
    }

    #[test]
    fn empty_layer_is_a_no_op() {
        let a = load_layered_yaml_from_strings(&["x: 1"]).unwrap();
        let b = load_layered_yaml_from_strings(&["x: 1", ""]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_layered_yaml(&["/nonexistent/ddcap.yaml"]).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/ddcap.yaml"));
    }
}
