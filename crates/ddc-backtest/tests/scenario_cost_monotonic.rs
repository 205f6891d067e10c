/// Costs are charged on turnover, so doubling the per-side cost must lower
/// final equity whenever the signal trades at all.
use ddc_backtest::{run_backtest, CostConfig, Signal};
use ddc_testkit::{sawtooth_series, ymd};

fn cost(commission_bps: f64, slippage_bps: f64) -> CostConfig {
    CostConfig {
        commission_bps,
        slippage_bps,
        initial_capital: 100_000.0,
    }
}

#[test]
fn doubling_cost_strictly_lowers_final_equity() {
    let series = sawtooth_series(ymd(2012, 1, 1), 250, 12, 0.1, 0.0003);
    let weights: Vec<f64> = (0..series.len()).map(|i| if i % 5 < 3 { 1.0 } else { 0.4 }).collect();
    let signal = Signal::from_weights(&series, weights);

    let base = run_backtest(&series, &signal, &cost(1.0, 2.0)).unwrap();
    let doubled = run_backtest(&series, &signal, &cost(2.0, 4.0)).unwrap();

    assert!(doubled.final_equity().unwrap() < base.final_equity().unwrap());
}

#[test]
fn doubling_cost_is_neutral_without_turnover() {
    let series = sawtooth_series(ymd(2012, 1, 1), 120, 12, 0.1, 0.0003);
    let flat = Signal::constant(&series, 0.0);

    let base = run_backtest(&series, &flat, &cost(1.0, 2.0)).unwrap();
    let doubled = run_backtest(&series, &flat, &cost(2.0, 4.0)).unwrap();

    assert_eq!(doubled.final_equity(), base.final_equity());
}
