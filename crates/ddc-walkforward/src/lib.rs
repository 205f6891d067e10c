//! ddc-walkforward
//!
//! Rolling train/validation folds over a price series, fixed-parameter fold
//! evaluation with out-of-sample stitching, and the walk-forward optimizer.
//!
//! Rules:
//! - Folds never reach into the holdout period
//! - One failing fold (strategy error, panic, short window) is recorded as
//!   `None` and never aborts the remaining folds
//! - Stitching is independent of the order folds were evaluated in

mod analysis;
mod evaluator;
mod folds;
mod optimizer;

pub use analysis::{
    final_test, run_strategy_on_slice, sensitivity_analysis, subperiod_analysis, HoldoutResult,
    SensitivityRow, SubperiodRow, MIN_HOLDOUT_ROWS, MIN_SUBPERIOD_ROWS,
};
pub use evaluator::{
    evaluate_params_across_folds, split_risk_scale, stitch_returns, FoldEvaluation, FoldReturns,
    MIN_FOLD_ROWS,
};
pub use folds::{add_years, build_folds, Fold, FoldWindows};
pub use optimizer::{walk_forward_optimize, FoldResult, WalkForwardOptions, WalkForwardReport};

use chrono::NaiveDate;
use ddc_backtest::BacktestError;
use ddc_strategy::StrategyError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum WalkForwardError {
    /// A window length (years) was zero.
    InvalidWindow { name: &'static str, value: u32 },
    /// No rows fall inside the requested date range.
    EmptyWindow { start: NaiveDate, end: NaiveDate },
    Strategy(StrategyError),
    Backtest(BacktestError),
    /// The strategy panicked; payload text when it was a string.
    StrategyPanicked { message: String },
}

impl std::fmt::Display for WalkForwardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWindow { name, value } => {
                write!(f, "{name} must be >= 1 year, got {value}")
            }
            Self::EmptyWindow { start, end } => {
                write!(f, "no price rows between {start} and {end}")
            }
            Self::Strategy(e) => write!(f, "strategy failed: {e}"),
            Self::Backtest(e) => write!(f, "backtest failed: {e}"),
            Self::StrategyPanicked { message } => write!(f, "strategy panicked: {message}"),
        }
    }
}

impl std::error::Error for WalkForwardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Strategy(e) => Some(e),
            Self::Backtest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StrategyError> for WalkForwardError {
    fn from(e: StrategyError) -> Self {
        Self::Strategy(e)
    }
}

impl From<BacktestError> for WalkForwardError {
    fn from(e: BacktestError) -> Self {
        Self::Backtest(e)
    }
}
