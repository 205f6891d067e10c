/// Negative costs would turn every trade into a rebate and must be rejected
/// before any bar is processed.
use ddc_backtest::{run_backtest, BacktestError, CostConfig, Signal};
use ddc_testkit::{trend_series, ymd};

#[test]
fn negative_commission_rejected() {
    let series = trend_series(ymd(2020, 1, 1), 10, 100.0, 0.001);
    let cost = CostConfig {
        commission_bps: -0.5,
        ..CostConfig::default()
    };
    let err = run_backtest(&series, &Signal::constant(&series, 1.0), &cost).unwrap_err();
    assert_eq!(
        err,
        BacktestError::NegativeCost {
            field: "commission_bps",
            value_bps: -0.5
        }
    );
    assert!(err.to_string().contains("commission_bps"));
}

#[test]
fn zero_costs_accepted() {
    let series = trend_series(ymd(2020, 1, 1), 10, 100.0, 0.001);
    let cost = CostConfig::frictionless(1.0);
    assert!(run_backtest(&series, &Signal::constant(&series, 1.0), &cost).is_ok());
}
