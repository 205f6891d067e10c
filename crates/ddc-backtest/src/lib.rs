//! ddc-backtest
//!
//! Vectorized long-only daily backtest over a single price series.
//!
//! - Position on date t is the signal observed on t-1 (no same-bar execution)
//! - Costs charged on turnover (|Δweight| × one-way cost), so fractional sizing
//!   pays only for the weight it changes
//! - Trades are maximal runs of non-flat position
//! - Metrics are a fixed key set recomputed per result, never cached

mod engine;
pub mod indicators;
pub mod loader;
pub mod metrics;
pub mod types;

pub use engine::{
    compound_returns, drawdown_values, extract_trades, run_backtest, run_buy_and_hold,
    validate_cost_config, BacktestError,
};
pub use indicators::add_indicators;
pub use loader::{load_price_csv, parse_price_csv, LoadError};
pub use metrics::{
    compute_metrics, compute_metrics_with_risk_free, drawdown_series, monthly_returns_table,
    MetricKey, Metrics, MonthlyReturnsRow,
};
pub use types::{
    clamp_weight, BacktestResult, CostConfig, DailySeries, DataError, PriceBar, PriceSeries,
    Signal, Trade, POSITION_EPSILON,
};
