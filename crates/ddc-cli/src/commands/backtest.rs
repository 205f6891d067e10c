//! `ddc backtest`: one strategy over the full history, next to buy-and-hold.

use anyhow::{Context, Result};

use ddc_backtest::{compute_metrics, run_buy_and_hold};
use ddc_config::UnusedKeyPolicy;
use ddc_selection::validate_risk_scales;
use ddc_strategy::{Params, StrategyRegistry};
use ddc_walkforward::{run_strategy_on_slice, split_risk_scale};

use super::{load_research_config, load_series, parse_param, print_metrics};

pub fn run_backtest_cmd(
    data: &str,
    strategy: &str,
    raw_params: &[String],
    risk_scale: Option<f64>,
    config_paths: &[String],
) -> Result<()> {
    let run = load_research_config(config_paths, UnusedKeyPolicy::Warn)?;
    let cost = run.config.costs;

    let registry = StrategyRegistry::catalog();
    let entry = registry.get(strategy)?;

    // Start from the first grid point; --param overrides individual keys.
    // --risk-scale wins over a risk_scale param.
    let mut params: Params = (entry.grid)().into_iter().next().unwrap_or_default();
    for raw in raw_params {
        let (k, v) = parse_param(raw)?;
        params.insert(k, v);
    }
    let (params, param_scale) = split_risk_scale(&params);
    let risk_scale = risk_scale.unwrap_or(param_scale);
    validate_risk_scales(&[risk_scale]).context("invalid --risk-scale")?;

    let series = load_series(data)?;
    let result = run_strategy_on_slice(&series, &entry.signal, &params, risk_scale, &cost)
        .with_context(|| format!("backtest failed: {strategy} ({params})"))?;
    let bh = run_buy_and_hold(&series, &cost).context("buy-and-hold failed")?;

    println!("backtest_ok=true");
    println!("strategy={}", entry.meta.name);
    println!("params={}", params);
    println!("risk_scale={}", risk_scale);
    println!("rows={}", series.len());
    println!("start={}", series.first_date());
    println!("end={}", series.last_date());
    println!("trades={}", result.trades.len());
    print_metrics("strategy", &compute_metrics(&result.equity, &result.trades));
    print_metrics("buy_and_hold", &compute_metrics(&bh.equity, &bh.trades));
    Ok(())
}
