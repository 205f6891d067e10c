//! Single-slice reruns: holdout test, one-parameter sensitivity sweeps and
//! named sub-period breakdowns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ddc_backtest::{run_backtest, BacktestResult, CostConfig, Metrics, PriceSeries};
use ddc_strategy::{ParamValue, Params, SignalStrategy};

use crate::evaluator::{isolate, metrics_of, split_risk_scale};
use crate::WalkForwardError;

/// Holdout windows shorter than this are still run, with a warning.
pub const MIN_HOLDOUT_ROWS: usize = 50;
/// Sub-periods shorter than this are skipped.
pub const MIN_SUBPERIOD_ROWS: usize = 50;

/// Signal, then `risk_scale` (clamped to [0, 1]), then backtest.
/// `params` must not carry `risk_scale`; see [`split_risk_scale`].
pub fn run_strategy_on_slice(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    params: &Params,
    risk_scale: f64,
    cost: &CostConfig,
) -> Result<BacktestResult, WalkForwardError> {
    let raw = strategy.signal(series, params)?;
    Ok(run_backtest(series, &raw.scaled(risk_scale), cost)?)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldoutResult {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: usize,
    pub metrics: Metrics,
    pub result: BacktestResult,
}

/// Backtest `params` (risk scale included) on everything from `holdout_start` on.
pub fn final_test(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    params: &Params,
    holdout_start: NaiveDate,
    cost: &CostConfig,
) -> Result<HoldoutResult, WalkForwardError> {
    let test = series
        .slice_from(holdout_start)
        .ok_or(WalkForwardError::EmptyWindow {
            start: holdout_start,
            end: series.last_date(),
        })?;
    if test.len() < MIN_HOLDOUT_ROWS {
        warn!(
            rows = test.len(),
            min = MIN_HOLDOUT_ROWS,
            %holdout_start,
            "holdout window is short"
        );
    }

    let (strat_params, risk_scale) = split_risk_scale(params);
    let result =
        isolate(|| run_strategy_on_slice(&test, strategy, &strat_params, risk_scale, cost))?;
    Ok(HoldoutResult {
        start: test.first_date(),
        end: test.last_date(),
        rows: test.len(),
        metrics: metrics_of(&result),
        result,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub value: ParamValue,
    pub metrics: Metrics,
}

/// Vary `param_name` over `values` with every other parameter fixed.
/// Values whose run fails are dropped.
pub fn sensitivity_analysis(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    base_params: &Params,
    param_name: &str,
    values: &[ParamValue],
    cost: &CostConfig,
) -> Vec<SensitivityRow> {
    values
        .iter()
        .filter_map(|&value| {
            let mut p = base_params.clone();
            p.insert(param_name, value);
            let (strat_params, risk_scale) = split_risk_scale(&p);
            let run = isolate(|| {
                run_strategy_on_slice(series, strategy, &strat_params, risk_scale, cost)
            });
            match run {
                Ok(result) => Some(SensitivityRow {
                    value,
                    metrics: metrics_of(&result),
                }),
                Err(e) => {
                    debug!(param = param_name, %value, error = %e, "sensitivity point dropped");
                    None
                }
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubperiodRow {
    /// `"<start> to <end>"` as requested.
    pub label: String,
    pub rows: usize,
    pub metrics: Metrics,
}

/// Evaluate fixed `params` on each `[start, end]` range independently.
pub fn subperiod_analysis(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    params: &Params,
    periods: &[(NaiveDate, NaiveDate)],
    cost: &CostConfig,
) -> Vec<SubperiodRow> {
    let (strat_params, risk_scale) = split_risk_scale(params);
    periods
        .iter()
        .filter_map(|&(start, end)| {
            let sub = series.slice(start, end)?;
            if sub.len() < MIN_SUBPERIOD_ROWS {
                debug!(%start, %end, rows = sub.len(), "sub-period skipped");
                return None;
            }
            isolate(|| run_strategy_on_slice(&sub, strategy, &strat_params, risk_scale, cost))
                .map_err(|e| debug!(%start, %end, error = %e, "sub-period run failed"))
                .ok()
                .map(|result| SubperiodRow {
                    label: format!("{start} to {end}"),
                    rows: sub.len(),
                    metrics: metrics_of(&result),
                })
        })
        .collect()
}
