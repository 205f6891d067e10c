use ddc_strategy::{Params, RISK_SCALE_KEY};
use ddc_walkforward::FoldEvaluation;

use crate::types::{ConstraintConfig, ConstraintDecision, RankedCandidate, SelectionScore};

/// Fewer valid folds than this can never pass.
pub const MIN_VALID_FOLDS: usize = 3;

// ============================================================================
// Constraints
// ============================================================================

/// Check one evaluation against the hard constraints.
///
/// All comparisons are inclusive; a NaN on either side fails closed.
/// - A: share of valid folds with `MaxDrawdown >= dd_cap` is `>= fold_pass_rate`
/// - B: stitched max drawdown `>= dd_cap`
/// - C: average exposure `>= min_exposure`
pub fn check_constraints(
    evaluation: Option<&FoldEvaluation>,
    config: &ConstraintConfig,
) -> ConstraintDecision {
    let Some(ev) = evaluation else {
        return ConstraintDecision {
            passed: false,
            fail_reasons: vec!["no valid evaluation".to_string()],
            n_valid_folds: 0,
            fold_pass_rate: 0.0,
        };
    };

    let valid: Vec<f64> = ev.valid_fold_metrics().map(|m| m.max_drawdown).collect();
    let n_valid = valid.len();
    if n_valid < MIN_VALID_FOLDS {
        return ConstraintDecision {
            passed: false,
            fail_reasons: vec![format!(
                "valid folds {n_valid} < min {MIN_VALID_FOLDS}"
            )],
            n_valid_folds: n_valid,
            fold_pass_rate: fold_pass_share(&valid, config.dd_cap),
        };
    }

    let mut fail_reasons = Vec::new();
    let rate = fold_pass_share(&valid, config.dd_cap);

    // Condition A: per-fold drawdown
    if rate.is_nan() || rate < config.fold_pass_rate {
        fail_reasons.push(format!(
            "fold pass rate {:.6} < min {:.6} (dd_cap {:.6})",
            rate, config.fold_pass_rate, config.dd_cap
        ));
    }
    // Condition B: stitched drawdown
    if ev.stitched_max_drawdown.is_nan() || ev.stitched_max_drawdown < config.dd_cap {
        fail_reasons.push(format!(
            "stitched MaxDD {:.6} < cap {:.6}",
            ev.stitched_max_drawdown, config.dd_cap
        ));
    }
    // Condition C: participation
    let exposure = ev.avg_metrics.exposure_pct;
    if exposure.is_nan() || exposure < config.min_exposure {
        fail_reasons.push(format!(
            "avg exposure {:.6} < min {:.6}",
            exposure, config.min_exposure
        ));
    }

    ConstraintDecision {
        passed: fail_reasons.is_empty(),
        fail_reasons,
        n_valid_folds: n_valid,
        fold_pass_rate: rate,
    }
}

/// Boolean projection of [`check_constraints`].
pub fn passes_constraints(
    evaluation: Option<&FoldEvaluation>,
    dd_cap: f64,
    fold_pass_rate: f64,
    min_exposure: f64,
) -> bool {
    let config = ConstraintConfig {
        dd_cap,
        fold_pass_rate,
        min_exposure,
    };
    check_constraints(evaluation, &config).passed
}

fn fold_pass_share(max_drawdowns: &[f64], dd_cap: f64) -> f64 {
    if max_drawdowns.is_empty() {
        return 0.0;
    }
    let n_pass = max_drawdowns.iter().filter(|&&dd| dd >= dd_cap).count();
    n_pass as f64 / max_drawdowns.len() as f64
}

// ============================================================================
// Scoring and ranking
// ============================================================================

/// `(avg CAGR, avg Sharpe, avg Calmar)`; a missing evaluation scores last.
pub fn score_for_selection(evaluation: Option<&FoldEvaluation>) -> SelectionScore {
    match evaluation {
        Some(ev) => SelectionScore::new(
            ev.avg_metrics.cagr,
            ev.avg_metrics.sharpe,
            ev.avg_metrics.calmar,
        ),
        None => SelectionScore::missing(),
    }
}

/// Sort best first. Stable: equal scores keep their incoming order.
pub fn rank_candidates(candidates: &mut [RankedCandidate]) {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
}

/// The winner of two candidates: higher score, then `a` on a full tie.
pub fn pick_winner<'a>(a: &'a RankedCandidate, b: &'a RankedCandidate) -> &'a RankedCandidate {
    if b.score > a.score {
        b
    } else {
        a
    }
}

// ============================================================================
// Grid expansion
// ============================================================================

/// Cross product of `base` with `risk_scales`, base-major. `base` is not modified.
pub fn expand_grid_with_risk_scale(base: &[Params], risk_scales: &[f64]) -> Vec<Params> {
    base.iter()
        .flat_map(|p| {
            risk_scales
                .iter()
                .map(move |&rs| p.clone().with(RISK_SCALE_KEY, rs))
        })
        .collect()
}
