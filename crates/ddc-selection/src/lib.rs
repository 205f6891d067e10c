//! ddc-selection
//!
//! Drawdown-capped candidate selection on top of walk-forward fold evaluations.
//!
//! - Hard constraints (fold drawdown pass rate, stitched drawdown, exposure)
//!   are AND'd and inclusive at the boundary
//! - Passing candidates rank by (CAGR, Sharpe, Calmar), descending and stable
//! - No passing candidate means no winner, never an unconstrained pick

mod evaluator;
mod research;
mod types;

pub use evaluator::{
    check_constraints, expand_grid_with_risk_scale, passes_constraints, pick_winner,
    rank_candidates, score_for_selection, MIN_VALID_FOLDS,
};
pub use research::{
    holdout_summary, run_ddcap_research, validate_risk_scales, ResearchOptions, ResearchOutcome,
    ResearchResult,
};
pub use types::{
    write_selection_report_json, ConstraintConfig, ConstraintDecision, HoldoutSummary,
    RankedCandidate, SelectionReport, SelectionScore, StrategySummary,
};

use ddc_backtest::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// A constraint threshold is out of range (or NaN).
    InvalidConstraint { name: &'static str, value: f64 },
    /// Risk scales must lie in (0, 1].
    InvalidRiskScale { value: f64 },
    EmptyRiskScales,
    Backtest(BacktestError),
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConstraint { name, value } => {
                write!(f, "constraint {name} out of range: {value}")
            }
            Self::InvalidRiskScale { value } => {
                write!(f, "risk_scale must be in (0, 1], got {value}")
            }
            Self::EmptyRiskScales => write!(f, "at least one risk_scale is required"),
            Self::Backtest(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SelectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backtest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BacktestError> for SelectionError {
    fn from(e: BacktestError) -> Self {
        Self::Backtest(e)
    }
}
