//! The optimizer grid-searches each training window and carries the winner
//! to validation; the consensus is the most frequently chosen set.
//!
//! Success criteria:
//! - the holdout defaults to three years before the last bar
//! - grid points failing the trade-frequency / exposure filters never win
//! - the objective picks the same set in every fold, so it is the consensus
use ddc_backtest::{MetricKey, PriceSeries, Signal};
use ddc_strategy::{Params, StrategyError};
use ddc_testkit::{trend_series, ymd};
use ddc_walkforward::{walk_forward_optimize, WalkForwardOptions};

/// Long for the first `hold` bars of every 20-bar cycle.
fn cycle(series: &PriceSeries, p: &Params) -> Result<Signal, StrategyError> {
    let hold = p.get_usize("hold")?;
    let weights = (0..series.len())
        .map(|i| if i % 20 < hold { 1.0 } else { 0.0 })
        .collect();
    Ok(Signal::from_weights(series, weights))
}

fn grid() -> Vec<Params> {
    [0, 5, 10, 15]
        .into_iter()
        .map(|hold| Params::new().with("hold", hold))
        .collect()
}

#[test]
fn consensus_is_the_highest_exposure_cycle() {
    let series = trend_series(ymd(1990, 1, 1), 252 * 16, 100.0, 0.0003);
    let opts = WalkForwardOptions {
        objective: MetricKey::ExposurePct,
        ..WalkForwardOptions::default()
    };

    let report = walk_forward_optimize(&series, &cycle, &grid(), &opts).unwrap();

    assert_eq!(
        report.holdout_start,
        series.last_date().checked_sub_months(chrono::Months::new(36)).unwrap()
    );
    assert_eq!(report.folds.len(), 2);
    assert_eq!(report.n_folds(), 2);
    for r in &report.fold_results {
        assert_eq!(r.best_params, Params::new().with("hold", 15));
        assert!(r.is_score > 70.0);
    }
    assert_eq!(report.best_params, Params::new().with("hold", 15));
    assert!(report.oos_metrics_avg.is_some());
}

#[test]
fn nothing_passes_filters_falls_back_to_first_grid_point() {
    let series = trend_series(ymd(1990, 1, 1), 252 * 16, 100.0, 0.0003);
    let only_flat = vec![Params::new().with("hold", 0)];

    let report =
        walk_forward_optimize(&series, &cycle, &only_flat, &WalkForwardOptions::default()).unwrap();

    assert_eq!(report.n_folds(), 0);
    assert_eq!(report.best_params, only_flat[0]);
    assert!(report.oos_metrics_avg.is_none());
}
