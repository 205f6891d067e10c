//! Walk-forward optimizer: grid-search each training window, carry the
//! winner to the validation window, then pick a consensus parameter set.

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ddc_backtest::{validate_cost_config, CostConfig, MetricKey, Metrics, PriceSeries};
use ddc_strategy::{Params, SignalStrategy};

use crate::evaluator::{isolate, metrics_of, split_risk_scale};
use crate::folds::fold_range;
use crate::{run_strategy_on_slice, Fold, FoldWindows, WalkForwardError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardOptions {
    pub windows: FoldWindows,
    /// Defaults to three years before the last date.
    pub holdout_start: Option<NaiveDate>,
    pub cost: CostConfig,
    pub objective: MetricKey,
    pub min_trades_per_year: f64,
    pub max_trades_per_year: f64,
    pub min_exposure_pct: f64,
    pub min_train_rows: usize,
    pub min_val_rows: usize,
}

impl Default for WalkForwardOptions {
    fn default() -> Self {
        Self {
            windows: FoldWindows::default(),
            holdout_start: None,
            cost: CostConfig::default(),
            objective: MetricKey::Calmar,
            min_trades_per_year: 0.5,
            max_trades_per_year: 50.0,
            min_exposure_pct: 10.0,
            min_train_rows: 252,
            min_val_rows: 100,
        }
    }
}

/// One fold that produced an in-sample winner and an out-of-sample run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_index: usize,
    pub fold: Fold,
    pub best_params: Params,
    pub is_score: f64,
    pub is_metrics: Metrics,
    pub oos_metrics: Metrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub holdout_start: NaiveDate,
    /// Folds planned before row-count filtering.
    pub folds: Vec<Fold>,
    /// Consensus: most frequently selected; ties go to the earliest selected.
    pub best_params: Params,
    pub fold_results: Vec<FoldResult>,
    /// `None` when no fold produced a result.
    pub oos_metrics_avg: Option<Metrics>,
    pub is_metrics_avg: Option<Metrics>,
}

impl WalkForwardReport {
    pub fn n_folds(&self) -> usize {
        self.fold_results.len()
    }
}

/// Walk-forward grid search of `grid` over the pre-holdout history.
///
/// If no full fold fits, a single split at 75% of the pre-holdout span is used.
pub fn walk_forward_optimize(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    grid: &[Params],
    opts: &WalkForwardOptions,
) -> Result<WalkForwardReport, WalkForwardError> {
    opts.windows.validate()?;
    validate_cost_config(&opts.cost)?;

    let start = series.first_date();
    let holdout_start = match opts.holdout_start {
        Some(d) => d,
        None => series
            .last_date()
            .checked_sub_months(Months::new(36))
            .unwrap_or(start),
    };

    let mut folds = fold_range(start, &opts.windows, holdout_start);
    if folds.is_empty() {
        folds.push(fallback_split(start, holdout_start));
    }
    info!(folds = folds.len(), %holdout_start, "walk-forward folds planned");

    let mut fold_results = Vec::new();
    for (fold_index, fold) in folds.iter().enumerate() {
        let (Some(train), Some(val)) = (
            series.slice(fold.train_start, fold.train_end),
            series.slice(fold.val_start, fold.val_end),
        ) else {
            debug!(fold = fold_index, "fold window empty");
            continue;
        };
        if train.len() < opts.min_train_rows || val.len() < opts.min_val_rows {
            debug!(
                fold = fold_index,
                train_rows = train.len(),
                val_rows = val.len(),
                "fold window too short"
            );
            continue;
        }

        let Some((best_params, is_score, is_metrics)) = search_grid(&train, strategy, grid, opts)
        else {
            debug!(fold = fold_index, "no parameter set met the training filters");
            continue;
        };

        let (strat_params, risk_scale) = split_risk_scale(&best_params);
        let run = isolate(|| {
            run_strategy_on_slice(&val, strategy, &strat_params, risk_scale, &opts.cost)
        });
        let val_result = match run {
            Ok(r) => r,
            Err(e) => {
                debug!(fold = fold_index, error = %e, "validation run failed");
                continue;
            }
        };
        let oos_metrics = metrics_of(&val_result);

        info!(
            fold = fold_index,
            is_score,
            oos = oos_metrics.get(opts.objective),
            params = %best_params,
            "fold optimized"
        );
        fold_results.push(FoldResult {
            fold_index,
            fold: *fold,
            best_params,
            is_score,
            is_metrics,
            oos_metrics,
        });
    }

    let best_params = consensus_params(&fold_results)
        .or_else(|| grid.first().cloned())
        .unwrap_or_default();
    let (oos_metrics_avg, is_metrics_avg) = if fold_results.is_empty() {
        (None, None)
    } else {
        (
            Some(Metrics::mean_of_finite(fold_results.iter().map(|r| &r.oos_metrics))),
            Some(Metrics::mean_of_finite(fold_results.iter().map(|r| &r.is_metrics))),
        )
    };

    Ok(WalkForwardReport {
        holdout_start,
        folds,
        best_params,
        fold_results,
        oos_metrics_avg,
        is_metrics_avg,
    })
}

fn fallback_split(start: NaiveDate, holdout_start: NaiveDate) -> Fold {
    let span_days = (holdout_start - start).num_days().max(0);
    let mid = start + Duration::days(span_days * 3 / 4);
    Fold {
        train_start: start,
        train_end: mid,
        val_start: mid,
        val_end: holdout_start,
    }
}

/// Best params on `train` by the objective; first best in grid order wins.
fn search_grid(
    train: &PriceSeries,
    strategy: &dyn SignalStrategy,
    grid: &[Params],
    opts: &WalkForwardOptions,
) -> Option<(Params, f64, Metrics)> {
    let mut best: Option<(Params, f64, Metrics)> = None;
    for params in grid {
        let (strat_params, risk_scale) = split_risk_scale(params);
        let run = isolate(|| {
            run_strategy_on_slice(train, strategy, &strat_params, risk_scale, &opts.cost)
        });
        let result = match run {
            Ok(r) => r,
            Err(e) => {
                debug!(params = %params, error = %e, "grid point failed");
                continue;
            }
        };
        let m = metrics_of(&result);
        if m.trades_per_year < opts.min_trades_per_year
            || m.trades_per_year > opts.max_trades_per_year
            || m.exposure_pct < opts.min_exposure_pct
        {
            continue;
        }

        let raw = m.get(opts.objective);
        let score = if raw.is_finite() { raw } else { 0.0 };
        if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
            best = Some((params.clone(), score, m));
        }
    }
    best
}

/// Most frequently selected params; ties go to the one selected first.
fn consensus_params(results: &[FoldResult]) -> Option<Params> {
    let mut counts: Vec<(&Params, usize)> = Vec::new();
    for r in results {
        match counts.iter_mut().find(|(p, _)| **p == r.best_params) {
            Some((_, n)) => *n += 1,
            None => counts.push((&r.best_params, 1)),
        }
    }
    let mut winner: Option<(&Params, usize)> = None;
    for (p, n) in counts {
        if winner.map_or(true, |(_, best)| n > best) {
            winner = Some((p, n));
        }
    }
    winner.map(|(p, _)| p.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddc_testkit::ymd;

    fn result_with(fold_index: usize, params: Params) -> FoldResult {
        FoldResult {
            fold_index,
            fold: Fold {
                train_start: ymd(2000, 1, 3),
                train_end: ymd(2001, 1, 3),
                val_start: ymd(2001, 1, 3),
                val_end: ymd(2002, 1, 3),
            },
            best_params: params,
            is_score: 0.0,
            is_metrics: Metrics::default(),
            oos_metrics: Metrics::default(),
        }
    }

    #[test]
    fn consensus_prefers_most_frequent() {
        let a = Params::new().with("n", 1);
        let b = Params::new().with("n", 2);
        let rs = vec![
            result_with(0, a.clone()),
            result_with(1, b.clone()),
            result_with(2, b.clone()),
        ];
        assert_eq!(consensus_params(&rs), Some(b));
    }

    #[test]
    fn consensus_tie_goes_to_earliest() {
        let a = Params::new().with("n", 1);
        let b = Params::new().with("n", 2);
        let rs = vec![
            result_with(0, b.clone()),
            result_with(1, a.clone()),
            result_with(2, a),
            result_with(3, b.clone()),
        ];
        assert_eq!(consensus_params(&rs), Some(b));
        assert_eq!(consensus_params(&[]), None);
    }

    #[test]
    fn fallback_split_is_three_quarters() {
        let f = fallback_split(ymd(2000, 1, 1), ymd(2000, 1, 1) + Duration::days(400));
        assert_eq!(f.train_end, ymd(2000, 1, 1) + Duration::days(300));
        assert_eq!(f.train_end, f.val_start);
    }
}
