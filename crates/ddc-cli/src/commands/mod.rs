//! Command handler modules for ddc.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod backtest;
pub mod inspect;
pub mod select;
pub mod walk_forward;

use anyhow::{bail, Context, Result};
use ddc_backtest::{add_indicators, load_price_csv, Metrics, PriceSeries};
use ddc_config::{
    load_layered_yaml, report_unused_keys, ResearchConfig, UnusedKeyPolicy,
};
use ddc_strategy::ParamValue;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Research config plus the hash of the files it came from.
pub struct RunConfig {
    pub config: ResearchConfig,
    /// `None` when running on built-in defaults.
    pub config_hash: Option<String>,
}

/// Load and validate layered config; no paths means defaults.
pub fn load_research_config(paths: &[String], policy: UnusedKeyPolicy) -> Result<RunConfig> {
    if paths.is_empty() {
        return Ok(RunConfig {
            config: ResearchConfig::default(),
            config_hash: None,
        });
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    report_unused_keys(&loaded.config_json, policy)?;
    let config = ResearchConfig::from_loaded(&loaded)?;
    Ok(RunConfig {
        config,
        config_hash: Some(loaded.config_hash),
    })
}

/// Load a daily CSV and attach the shared indicator columns.
pub fn load_series(path: &str) -> Result<PriceSeries> {
    let mut series =
        load_price_csv(path).with_context(|| format!("load price csv failed: {path}"))?;
    add_indicators(&mut series).context("attach indicators failed")?;
    Ok(series)
}

/// Parse `name=value`.
pub fn parse_param(raw: &str) -> Result<(String, ParamValue)> {
    let Some((k, v)) = raw.split_once('=') else {
        bail!("invalid --param '{raw}'. expected name=value");
    };
    let key = k.trim();
    if key.is_empty() {
        bail!("invalid --param '{raw}'. empty name");
    }
    let value = ParamValue::parse(v)
        .with_context(|| format!("invalid --param '{raw}'. value must be numeric"))?;
    Ok((key.to_string(), value))
}

/// Parse `0.5,0.8,1.0`.
pub fn parse_risk_scales(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("invalid risk scale '{s}'"))
        })
        .collect()
}

/// One `key=value` line per headline metric.
pub fn print_metrics(prefix: &str, m: &Metrics) {
    println!("{prefix}_cagr={:.6}", m.cagr);
    println!("{prefix}_sharpe={:.6}", m.sharpe);
    println!("{prefix}_max_drawdown={:.6}", m.max_drawdown);
    println!("{prefix}_calmar={:.6}", m.calmar);
    println!("{prefix}_exposure_pct={:.4}", m.exposure_pct);
    println!("{prefix}_trades_per_year={:.4}", m.trades_per_year);
    println!("{prefix}_total_return={:.6}", m.total_return);
}
