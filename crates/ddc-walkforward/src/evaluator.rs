use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ddc_backtest::{
    compound_returns, compute_metrics, drawdown_values, BacktestResult, CostConfig, DailySeries,
    Metrics, PriceSeries,
};
use ddc_strategy::{Params, SignalStrategy, RISK_SCALE_KEY};

use crate::analysis::run_strategy_on_slice;
use crate::{Fold, WalkForwardError};

/// Validation windows shorter than this are recorded as failed folds.
pub const MIN_FOLD_ROWS: usize = 100;

/// Out-of-sample daily returns of one evaluated fold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldReturns {
    /// Position of the fold in the fold list; breaks ties on shared dates.
    pub fold_index: usize,
    pub daily_returns: DailySeries,
}

/// One fixed parameter set run across every validation window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldEvaluation {
    /// One entry per fold; `None` when the window was too short or the strategy failed.
    pub fold_metrics: Vec<Option<Metrics>>,
    pub fold_daily_returns: Vec<FoldReturns>,
    pub stitched_equity: DailySeries,
    pub stitched_drawdown: DailySeries,
    pub stitched_max_drawdown: f64,
    /// Finite-only per-key mean over the valid folds.
    pub avg_metrics: Metrics,
    pub n_valid_folds: usize,
}

impl FoldEvaluation {
    pub fn valid_fold_metrics(&self) -> impl Iterator<Item = &Metrics> {
        self.fold_metrics.iter().flatten()
    }
}

/// Split off `risk_scale` (default 1.0). The input is left untouched.
pub fn split_risk_scale(params: &Params) -> (Params, f64) {
    let scale = params
        .get(RISK_SCALE_KEY)
        .map(|v| v.as_f64())
        .unwrap_or(1.0);
    (params.without(RISK_SCALE_KEY), scale)
}

/// Run `f`, turning a panic into [`WalkForwardError::StrategyPanicked`].
pub(crate) fn isolate<T>(
    f: impl FnOnce() -> Result<T, WalkForwardError>,
) -> Result<T, WalkForwardError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(WalkForwardError::StrategyPanicked { message })
        }
    }
}

/// Evaluate a fixed parameter set on every fold's validation window.
///
/// Returns `None` when no fold produced a result.
pub fn evaluate_params_across_folds(
    series: &PriceSeries,
    folds: &[Fold],
    strategy: &dyn SignalStrategy,
    params: &Params,
    cost: &CostConfig,
    min_fold_rows: usize,
) -> Option<FoldEvaluation> {
    let (strat_params, risk_scale) = split_risk_scale(params);

    let mut fold_metrics = Vec::with_capacity(folds.len());
    let mut fold_daily_returns = Vec::new();

    for (fold_index, fold) in folds.iter().enumerate() {
        let val = match series.slice(fold.val_start, fold.val_end) {
            Some(s) if s.len() >= min_fold_rows => s,
            other => {
                debug!(
                    fold = fold_index,
                    rows = other.map(|s| s.len()).unwrap_or(0),
                    min_fold_rows,
                    "validation window too short"
                );
                fold_metrics.push(None);
                continue;
            }
        };

        let run =
            isolate(|| run_strategy_on_slice(&val, strategy, &strat_params, risk_scale, cost));
        match run {
            Ok(result) => {
                fold_metrics.push(Some(metrics_of(&result)));
                fold_daily_returns.push(FoldReturns {
                    fold_index,
                    daily_returns: result.daily_returns,
                });
            }
            Err(e) => {
                debug!(fold = fold_index, params = %params, error = %e, "fold evaluation failed");
                fold_metrics.push(None);
            }
        }
    }

    let stitched = stitch_returns(&fold_daily_returns);
    if stitched.is_empty() {
        return None;
    }
    let n_valid_folds = fold_metrics.iter().flatten().count();
    if n_valid_folds == 0 {
        return None;
    }

    let (stitched_equity, stitched_drawdown) = stitched_curves(&stitched, cost.initial_capital);
    let stitched_max_drawdown = stitched_drawdown
        .iter()
        .map(|&(_, d)| d)
        .fold(0.0_f64, f64::min);
    let avg_metrics = Metrics::mean_of_finite(fold_metrics.iter().flatten());

    Some(FoldEvaluation {
        fold_metrics,
        fold_daily_returns,
        stitched_equity,
        stitched_drawdown,
        stitched_max_drawdown,
        avg_metrics,
        n_valid_folds,
    })
}

/// Merge fold return segments into one chronological series.
///
/// Sorted by date, then fold index; a date shared by several folds keeps
/// the earliest fold's value. The result does not depend on the order of
/// `segments`.
pub fn stitch_returns(segments: &[FoldReturns]) -> DailySeries {
    let mut rows: Vec<(NaiveDate, usize, f64)> = segments
        .iter()
        .flat_map(|s| s.daily_returns.iter().map(move |&(d, r)| (d, s.fold_index, r)))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    rows.dedup_by_key(|r| r.0);
    rows.into_iter().map(|(d, _, r)| (d, r)).collect()
}

fn stitched_curves(returns: &DailySeries, initial_capital: f64) -> (DailySeries, DailySeries) {
    let values: Vec<f64> = returns.iter().map(|&(_, r)| r).collect();
    let equity = compound_returns(&values, initial_capital);
    let drawdown = drawdown_values(&equity);
    let dates = returns.iter().map(|&(d, _)| d);
    (
        dates.clone().zip(equity).collect(),
        dates.zip(drawdown).collect(),
    )
}

pub(crate) fn metrics_of(result: &BacktestResult) -> Metrics {
    compute_metrics(&result.equity, &result.trades)
}
