use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ddc_backtest::{CostConfig, Metrics};
use ddc_strategy::Params;
use ddc_walkforward::Fold;

use crate::SelectionError;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Hard drawdown / participation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Worst tolerated max drawdown, as a negative fraction (-0.20 = -20%).
    pub dd_cap: f64,
    /// Minimum share of valid folds whose max drawdown is within the cap (0..1).
    pub fold_pass_rate: f64,
    /// Minimum average out-of-sample exposure, in percent.
    pub min_exposure: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            dd_cap: -0.20,
            fold_pass_rate: 0.80,
            min_exposure: 60.0,
        }
    }
}

impl ConstraintConfig {
    pub fn validate(&self) -> Result<(), SelectionError> {
        check_range("dd_cap", self.dd_cap, -1.0, 0.0)?;
        check_range("fold_pass_rate", self.fold_pass_rate, 0.0, 1.0)?;
        check_range("min_exposure", self.min_exposure, 0.0, 100.0)
    }
}

fn check_range(name: &'static str, value: f64, lo: f64, hi: f64) -> Result<(), SelectionError> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(SelectionError::InvalidConstraint { name, value })
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Constraint result for a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDecision {
    pub passed: bool,
    /// Stable-ordered fail reasons (fold count, then A, B, C). Empty when passed.
    pub fail_reasons: Vec<String>,
    pub n_valid_folds: usize,
    /// Share of valid folds within the cap; 0.0 with no valid folds.
    pub fold_pass_rate: f64,
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// Descending ranking key: average OOS CAGR, then Sharpe, then Calmar.
///
/// Missing or NaN components are [`SelectionScore::MISSING`], so a malformed
/// evaluation sorts last instead of breaking the comparator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionScore {
    pub cagr: f64,
    pub sharpe: f64,
    pub calmar: f64,
}

impl SelectionScore {
    pub const MISSING: f64 = -999.0;

    pub fn new(cagr: f64, sharpe: f64, calmar: f64) -> Self {
        let clean = |v: f64| if v.is_nan() { Self::MISSING } else { v };
        Self {
            cagr: clean(cagr),
            sharpe: clean(sharpe),
            calmar: clean(calmar),
        }
    }

    pub fn missing() -> Self {
        Self::new(Self::MISSING, Self::MISSING, Self::MISSING)
    }
}

impl Ord for SelectionScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cagr
            .total_cmp(&other.cagr)
            .then(self.sharpe.total_cmp(&other.sharpe))
            .then(self.calmar.total_cmp(&other.calmar))
    }
}

impl PartialOrd for SelectionScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SelectionScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SelectionScore {}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A passing (strategy, params) pair, reduced to what ranking and reporting need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub strategy: String,
    /// Full parameter set, `risk_scale` included.
    pub params: Params,
    pub score: SelectionScore,
    pub avg_metrics: Metrics,
    /// Per fold; `None` for failed folds.
    pub fold_metrics: Vec<Option<Metrics>>,
    pub stitched_max_drawdown: f64,
    pub n_valid_folds: usize,
    pub fold_pass_rate: f64,
}

/// Per-strategy tally of one research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub name: String,
    pub base_grid_size: usize,
    pub expanded_grid_size: usize,
    /// Candidates with a non-null evaluation.
    pub n_evaluated: usize,
    /// Candidates whose evaluation was null.
    pub n_errors: usize,
    pub n_passed: usize,
    pub best: Option<RankedCandidate>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Holdout metrics of the winner next to buy-and-hold over the same window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: usize,
    pub winner: Metrics,
    pub buy_and_hold: Metrics,
}

/// Full research artifact (serializable to JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    pub constraints: ConstraintConfig,
    pub cost: CostConfig,
    pub risk_scales: Vec<f64>,
    pub holdout_start: NaiveDate,
    pub folds: Vec<Fold>,
    pub strategies: Vec<StrategySummary>,
    /// Best candidate per strategy, best first.
    pub ranking: Vec<RankedCandidate>,
    /// `None` means no viable strategy.
    pub winner: Option<RankedCandidate>,
    pub holdout: Option<HoldoutSummary>,
}

/// Write the report as pretty-printed JSON to `out_dir/selection_report.json`.
/// Returns the path written.
///
/// Non-finite metrics (an infinite profit factor) are written as `null`.
pub fn write_selection_report_json(
    out_dir: &Path,
    report: &SelectionReport,
) -> io::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join("selection_report.json");
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
