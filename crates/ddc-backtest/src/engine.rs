use chrono::NaiveDate;

use crate::types::{
    BacktestResult, CostConfig, DailySeries, PriceSeries, Signal, Trade, POSITION_EPSILON,
};

/// Backtest error variants.
#[derive(Clone, Debug, PartialEq)]
pub enum BacktestError {
    /// Negative commission or slippage would make every trade a rebate.
    NegativeCost {
        /// The field name that carried the negative value.
        field: &'static str,
        value_bps: f64,
    },
    NonPositiveCapital { value: f64 },
    EmptySeries,
}

impl core::fmt::Display for BacktestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BacktestError::NegativeCost { field, value_bps } => write!(
                f,
                "negative cost rejected: {} = {} bps (must be >= 0)",
                field, value_bps
            ),
            BacktestError::NonPositiveCapital { value } => {
                write!(f, "initial_capital must be > 0, got {}", value)
            }
            BacktestError::EmptySeries => write!(f, "price series is empty"),
        }
    }
}

impl std::error::Error for BacktestError {}

/// Reject cost configs that would produce favorable fills or a degenerate curve.
///
/// NaN fails closed.
pub fn validate_cost_config(cost: &CostConfig) -> Result<(), BacktestError> {
    if cost.commission_bps.is_nan() || cost.commission_bps < 0.0 {
        return Err(BacktestError::NegativeCost {
            field: "commission_bps",
            value_bps: cost.commission_bps,
        });
    }
    if cost.slippage_bps.is_nan() || cost.slippage_bps < 0.0 {
        return Err(BacktestError::NegativeCost {
            field: "slippage_bps",
            value_bps: cost.slippage_bps,
        });
    }
    if !cost.initial_capital.is_finite() || cost.initial_capital <= 0.0 {
        return Err(BacktestError::NonPositiveCapital {
            value: cost.initial_capital,
        });
    }
    Ok(())
}

/// Run a long-only daily backtest.
///
/// Pipeline:
/// 1. Reindex the signal onto the series (missing -> 0.0, clamp [0, 1])
/// 2. Lag by one bar: position(t) = signal(t-1), position(0) = 0
/// 3. strat_ret(t) = position(t) * close return(t) - |Δposition(t)| * one_way_cost
/// 4. Compound into equity, derive drawdown, extract trades
pub fn run_backtest(
    series: &PriceSeries,
    signal: &Signal,
    cost: &CostConfig,
) -> Result<BacktestResult, BacktestError> {
    validate_cost_config(cost)?;
    if series.is_empty() {
        return Err(BacktestError::EmptySeries);
    }

    let dates = series.dates();
    let closes = series.closes();
    let weights = signal.reindex(series);
    let one_way = cost.one_way_cost();

    let n = dates.len();
    let mut positions = Vec::with_capacity(n);
    let mut strat_ret = Vec::with_capacity(n);
    let mut prev_pos = 0.0_f64;

    for i in 0..n {
        let pos = if i == 0 { 0.0 } else { weights[i - 1] };
        let market_ret = if i == 0 {
            0.0
        } else {
            closes[i] / closes[i - 1] - 1.0
        };
        let turnover = if i == 0 { 0.0 } else { (pos - prev_pos).abs() };

        positions.push(pos);
        strat_ret.push(pos * market_ret - turnover * one_way);
        prev_pos = pos;
    }

    let equity_values = compound_returns(&strat_ret, cost.initial_capital);
    let dd_values = drawdown_values(&equity_values);
    let trades = extract_trades(&dates, &closes, &positions, &strat_ret);

    Ok(BacktestResult {
        equity: zip_dates(&dates, equity_values),
        drawdown: zip_dates(&dates, dd_values),
        trades,
        positions: zip_dates(&dates, positions),
        daily_returns: zip_dates(&dates, strat_ret),
    })
}

/// Benchmark: constant weight 1.0 through the same engine.
pub fn run_buy_and_hold(
    series: &PriceSeries,
    cost: &CostConfig,
) -> Result<BacktestResult, BacktestError> {
    run_backtest(series, &Signal::constant(series, 1.0), cost)
}

/// `capital * Π(1 + r)`, one value per return.
pub fn compound_returns(returns: &[f64], initial_capital: f64) -> Vec<f64> {
    let mut acc = 1.0_f64;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r;
            acc * initial_capital
        })
        .collect()
}

/// `(equity - running_max) / running_max` per row; always <= 0.
pub fn drawdown_values(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            if e > peak {
                peak = e;
            }
            if peak > 0.0 {
                ((e - peak) / peak).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn zip_dates(dates: &[NaiveDate], values: Vec<f64>) -> DailySeries {
    dates.iter().copied().zip(values).collect()
}

/// Split positions into trades: one per maximal run with weight above
/// [`POSITION_EPSILON`].
///
/// A run that ends on bar `i` is closed at bar `i - 1` (the last day actually
/// held). A run still open on the final bar is closed there.
pub fn extract_trades(
    dates: &[NaiveDate],
    closes: &[f64],
    positions: &[f64],
    strat_ret: &[f64],
) -> Vec<Trade> {
    struct Open {
        entry_date: NaiveDate,
        entry_price: f64,
        cum_ret: f64,
        bars: usize,
    }

    let n = dates.len().min(closes.len()).min(positions.len()).min(strat_ret.len());
    let mut trades = Vec::new();
    let mut open: Option<Open> = None;

    for i in 0..n {
        let in_market = positions[i] > POSITION_EPSILON;
        open = match (open.take(), in_market) {
            (None, true) => Some(Open {
                entry_date: dates[i],
                entry_price: closes[i],
                cum_ret: strat_ret[i],
                bars: 1,
            }),
            (Some(mut t), true) => {
                t.cum_ret += strat_ret[i];
                t.bars += 1;
                Some(t)
            }
            (Some(t), false) => {
                let last = i.saturating_sub(1);
                trades.push(Trade {
                    entry_date: t.entry_date,
                    exit_date: dates[last],
                    entry_price: t.entry_price,
                    exit_price: closes[last],
                    cumulative_return: t.cum_ret,
                    bars_held: t.bars,
                });
                None
            }
            (None, false) => None,
        };
    }

    if let Some(t) = open {
        let last = n - 1;
        trades.push(Trade {
            entry_date: t.entry_date,
            exit_date: dates[last],
            entry_price: t.entry_price,
            exit_price: closes[last],
            cumulative_return: t.cum_ret,
            bars_held: t.bars,
        });
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceBar;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let d = start + chrono::Duration::days(i as i64);
                PriceBar::new(d, c, c, c, c, 1.0)
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn position_lags_signal_by_one_bar() {
        let s = series(&[100.0, 110.0, 121.0]);
        let sig = Signal::from_weights(&s, vec![1.0, 1.0, 0.0]);
        let r = run_backtest(&s, &sig, &CostConfig::frictionless(1000.0)).unwrap();
        let pos: Vec<f64> = r.positions.iter().map(|p| p.1).collect();
        assert_eq!(pos, vec![0.0, 1.0, 1.0]);
        assert!((r.final_equity().unwrap() - 1210.0).abs() < 1e-9);
    }

    #[test]
    fn turnover_cost_is_charged_on_weight_change() {
        let s = series(&[100.0, 100.0, 100.0, 100.0]);
        let sig = Signal::from_weights(&s, vec![0.5, 1.0, 0.0, 0.0]);
        let cost = CostConfig {
            commission_bps: 5.0,
            slippage_bps: 5.0,
            initial_capital: 1.0,
        };
        let r = run_backtest(&s, &sig, &cost).unwrap();
        let rets: Vec<f64> = r.daily_returns.iter().map(|p| p.1).collect();
        // turnover: 0, 0.5, 0.5, 1.0 at 10 bps
        let expected = [0.0, -0.0005, -0.0005, -0.001];
        for (a, b) in rets.iter().zip(expected) {
            assert!((a - b).abs() < 1e-15, "{a} vs {b}");
        }
    }

    #[test]
    fn negative_costs_are_rejected() {
        let s = series(&[1.0, 2.0]);
        let sig = Signal::constant(&s, 1.0);
        let cost = CostConfig {
            slippage_bps: -1.0,
            ..CostConfig::default()
        };
        assert_eq!(
            run_backtest(&s, &sig, &cost),
            Err(BacktestError::NegativeCost {
                field: "slippage_bps",
                value_bps: -1.0
            })
        );
        let cost = CostConfig {
            initial_capital: 0.0,
            ..CostConfig::default()
        };
        assert!(matches!(
            run_backtest(&s, &sig, &cost),
            Err(BacktestError::NonPositiveCapital { .. })
        ));
    }

    #[test]
    fn exit_is_dated_to_last_held_bar() {
        let s = series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        // positions become [0, 1, 1, 0, 0]
        let sig = Signal::from_weights(&s, vec![1.0, 1.0, 0.0, 0.0, 0.0]);
        let r = run_backtest(&s, &sig, &CostConfig::frictionless(1.0)).unwrap();
        assert_eq!(r.trades.len(), 1);
        let t = &r.trades[0];
        assert_eq!(t.entry_date, s.bars()[1].date);
        assert_eq!(t.exit_date, s.bars()[2].date);
        assert_eq!(t.entry_price, 11.0);
        assert_eq!(t.exit_price, 12.0);
        assert_eq!(t.bars_held, 2);
    }

    #[test]
    fn open_trade_is_closed_on_final_bar() {
        let s = series(&[10.0, 11.0, 12.0]);
        let r = run_buy_and_hold(&s, &CostConfig::frictionless(1.0)).unwrap();
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].exit_date, s.last_date());
        assert_eq!(r.trades[0].bars_held, 2);
    }

    #[test]
    fn weight_at_epsilon_is_flat() {
        let s = series(&[10.0, 11.0, 12.0]);
        let sig = Signal::from_weights(&s, vec![POSITION_EPSILON, POSITION_EPSILON, 0.0]);
        let r = run_backtest(&s, &sig, &CostConfig::frictionless(1.0)).unwrap();
        assert!(r.trades.is_empty());
    }

    #[test]
    fn partial_weight_changes_do_not_split_trades() {
        let s = series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let sig = Signal::from_weights(&s, vec![0.3, 1.0, 0.5, 0.7, 0.7]);
        let r = run_backtest(&s, &sig, &CostConfig::default()).unwrap();
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].bars_held, 4);
    }

    #[test]
    fn drawdown_values_track_running_peak() {
        let dd = drawdown_values(&[100.0, 120.0, 90.0, 120.0, 130.0]);
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert!((dd[2] + 0.25).abs() < 1e-12);
        assert_eq!(dd[3], 0.0);
        assert_eq!(dd[4], 0.0);
    }
}
