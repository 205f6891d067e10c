//! Drawdown-capped research: every strategy x risk-scale candidate through
//! every fold, hard constraints, then ranking of the survivors.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ddc_backtest::{compute_metrics, run_buy_and_hold, CostConfig, PriceSeries};
use ddc_strategy::StrategyEntry;
use ddc_walkforward::{
    evaluate_params_across_folds, final_test, Fold, FoldEvaluation, WalkForwardError,
    MIN_FOLD_ROWS,
};

use crate::evaluator::{
    check_constraints, expand_grid_with_risk_scale, rank_candidates, score_for_selection,
};
use crate::types::{ConstraintConfig, HoldoutSummary, RankedCandidate, StrategySummary};
use crate::SelectionError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchOptions {
    pub cost: CostConfig,
    pub constraints: ConstraintConfig,
    pub min_fold_rows: usize,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            cost: CostConfig::default(),
            constraints: ConstraintConfig::default(),
            min_fold_rows: MIN_FOLD_ROWS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResearchOutcome {
    Winner(RankedCandidate),
    /// Nothing passed every constraint. No unconstrained fallback is picked.
    NoViableStrategy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchResult {
    pub strategies: Vec<StrategySummary>,
    /// Best candidate per strategy, best first.
    pub ranking: Vec<RankedCandidate>,
    pub outcome: ResearchOutcome,
    /// Full fold evaluation of the winner (stitched curves included).
    pub winner_evaluation: Option<FoldEvaluation>,
}

impl ResearchResult {
    pub fn winner(&self) -> Option<&RankedCandidate> {
        match &self.outcome {
            ResearchOutcome::Winner(w) => Some(w),
            ResearchOutcome::NoViableStrategy => None,
        }
    }
}

/// Check risk scales are non-empty and each in (0, 1].
pub fn validate_risk_scales(risk_scales: &[f64]) -> Result<(), SelectionError> {
    if risk_scales.is_empty() {
        return Err(SelectionError::EmptyRiskScales);
    }
    match risk_scales
        .iter()
        .find(|&&rs| rs.is_nan() || rs <= 0.0 || rs > 1.0)
    {
        Some(&value) => Err(SelectionError::InvalidRiskScale { value }),
        None => Ok(()),
    }
}

/// Run the drawdown-capped selection over `strategies`.
///
/// Candidates are evaluated in parallel and collected in grid order, so the
/// result matches a sequential run.
pub fn run_ddcap_research(
    series: &PriceSeries,
    folds: &[Fold],
    strategies: &[StrategyEntry],
    risk_scales: &[f64],
    opts: &ResearchOptions,
) -> Result<ResearchResult, SelectionError> {
    opts.constraints.validate()?;
    validate_risk_scales(risk_scales)?;
    ddc_backtest::validate_cost_config(&opts.cost)?;

    let mut summaries = Vec::with_capacity(strategies.len());
    let mut ranking: Vec<RankedCandidate> = Vec::new();
    let mut best_evaluations: Vec<(String, FoldEvaluation)> = Vec::new();

    for entry in strategies {
        let name = entry.meta.name.as_str();
        let base = (entry.grid)();
        let grid = expand_grid_with_risk_scale(&base, risk_scales);
        info!(
            strategy = name,
            base = base.len(),
            risk_scales = risk_scales.len(),
            candidates = grid.len(),
            "evaluating strategy"
        );

        let evaluations: Vec<Option<FoldEvaluation>> = grid
            .par_iter()
            .map(|params| {
                evaluate_params_across_folds(
                    series,
                    folds,
                    &entry.signal,
                    params,
                    &opts.cost,
                    opts.min_fold_rows,
                )
            })
            .collect();

        let n_errors = evaluations.iter().filter(|e| e.is_none()).count();
        let mut passing: Vec<(RankedCandidate, FoldEvaluation)> = grid
            .iter()
            .zip(evaluations)
            .filter_map(|(params, ev)| {
                let ev = ev?;
                let decision = check_constraints(Some(&ev), &opts.constraints);
                if !decision.passed {
                    return None;
                }
                let candidate = RankedCandidate {
                    strategy: name.to_string(),
                    params: params.clone(),
                    score: score_for_selection(Some(&ev)),
                    avg_metrics: ev.avg_metrics,
                    fold_metrics: ev.fold_metrics.clone(),
                    stitched_max_drawdown: ev.stitched_max_drawdown,
                    n_valid_folds: decision.n_valid_folds,
                    fold_pass_rate: decision.fold_pass_rate,
                };
                Some((candidate, ev))
            })
            .collect();
        passing.sort_by(|a, b| b.0.score.cmp(&a.0.score));

        let n_passed = passing.len();
        info!(
            strategy = name,
            evaluated = grid.len() - n_errors,
            passed = n_passed,
            errors = n_errors,
            "strategy done"
        );

        let best = passing.into_iter().next();
        summaries.push(StrategySummary {
            name: name.to_string(),
            base_grid_size: base.len(),
            expanded_grid_size: grid.len(),
            n_evaluated: grid.len() - n_errors,
            n_errors,
            n_passed,
            best: best.as_ref().map(|(c, _)| c.clone()),
        });
        if let Some((candidate, ev)) = best {
            best_evaluations.push((candidate.strategy.clone(), ev));
            ranking.push(candidate);
        }
    }

    rank_candidates(&mut ranking);

    let (outcome, winner_evaluation) = match ranking.first().cloned() {
        Some(winner) => {
            let ev = best_evaluations
                .into_iter()
                .find(|(n, _)| *n == winner.strategy)
                .map(|(_, ev)| ev);
            info!(
                strategy = %winner.strategy,
                params = %winner.params,
                cagr = winner.score.cagr,
                stitched_max_drawdown = winner.stitched_max_drawdown,
                "winner selected"
            );
            (ResearchOutcome::Winner(winner), ev)
        }
        None => {
            warn!("no strategy passed the drawdown constraints");
            (ResearchOutcome::NoViableStrategy, None)
        }
    };

    Ok(ResearchResult {
        strategies: summaries,
        ranking,
        outcome,
        winner_evaluation,
    })
}

/// Winner and buy-and-hold over the holdout window.
pub fn holdout_summary(
    series: &PriceSeries,
    entry: &StrategyEntry,
    winner: &RankedCandidate,
    holdout_start: NaiveDate,
    cost: &CostConfig,
) -> Result<HoldoutSummary, WalkForwardError> {
    let held = final_test(series, &entry.signal, &winner.params, holdout_start, cost)?;
    let window = series
        .slice_from(holdout_start)
        .ok_or(WalkForwardError::EmptyWindow {
            start: holdout_start,
            end: series.last_date(),
        })?;
    let bh = run_buy_and_hold(&window, cost)?;
    Ok(HoldoutSummary {
        start: held.start,
        end: held.end,
        rows: held.rows,
        winner: held.metrics,
        buy_and_hold: compute_metrics(&bh.equity, &bh.trades),
    })
}
