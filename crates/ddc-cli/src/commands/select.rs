//! `ddc select`: drawdown-capped research across strategies and risk scales.
//!
//! Writes `selection_report.json` whether or not a winner exists; exits
//! non-zero when no candidate passes the constraints.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use ddc_config::UnusedKeyPolicy;
use ddc_selection::{
    holdout_summary, run_ddcap_research, write_selection_report_json, SelectionReport,
    MIN_VALID_FOLDS,
};
use ddc_strategy::{StrategyEntry, StrategyRegistry};
use ddc_walkforward::build_folds;

use super::{load_research_config, load_series, parse_risk_scales, print_metrics};

pub struct SelectArgs {
    pub data: String,
    pub config_paths: Vec<String>,
    /// Positive percent; 20 means a -20% cap.
    pub dd_cap_pct: Option<f64>,
    pub risk_scales: Option<String>,
    pub out: Option<String>,
    pub strict_config: bool,
}

pub fn run_select_cmd(args: SelectArgs) -> Result<()> {
    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let run = load_research_config(&args.config_paths, policy)?;
    let mut cfg = run.config;
    if let Some(pct) = args.dd_cap_pct {
        cfg.constraints.dd_cap = -pct.abs() / 100.0;
    }
    if let Some(raw) = args.risk_scales.as_deref() {
        cfg.risk_scales = parse_risk_scales(raw)?;
    }
    cfg.validate().context("invalid select options")?;

    let registry = StrategyRegistry::catalog();
    let entries: Vec<StrategyEntry> = cfg
        .strategies
        .iter()
        .map(|name| registry.get(name).cloned())
        .collect::<Result<_, _>>()?;

    let series = load_series(&args.data)?;
    let holdout_start = cfg.walk_forward.holdout_start;
    let folds = build_folds(&series, &cfg.fold_windows(), holdout_start)
        .context("fold generation failed")?;
    if folds.len() < MIN_VALID_FOLDS {
        warn!(
            folds = folds.len(),
            min = MIN_VALID_FOLDS,
            "too few folds for any candidate to pass"
        );
    }

    let run_id = Uuid::new_v4();
    info!(%run_id, folds = folds.len(), strategies = entries.len(), "select started");

    let research = run_ddcap_research(
        &series,
        &folds,
        &entries,
        &cfg.risk_scales,
        &cfg.research_options(),
    )?;

    // The research result is written even when the holdout cannot be run.
    let holdout = match research.winner() {
        Some(w) => {
            let entry = registry.get(&w.strategy)?;
            match holdout_summary(&series, entry, w, holdout_start, &cfg.costs) {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!(%holdout_start, error = %e, "holdout evaluation failed");
                    None
                }
            }
        }
        None => None,
    };

    let report = SelectionReport {
        run_id: Some(run_id.to_string()),
        config_hash: run.config_hash.clone(),
        constraints: cfg.constraints,
        cost: cfg.costs,
        risk_scales: cfg.risk_scales.clone(),
        holdout_start,
        folds,
        strategies: research.strategies.clone(),
        ranking: research.ranking.clone(),
        winner: research.winner().cloned(),
        holdout,
    };

    let out_dir = args
        .out
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("exports").join("select").join(run_id.to_string()));
    let report_path = write_selection_report_json(&out_dir, &report)
        .with_context(|| format!("write selection report failed: {}", out_dir.display()))?;

    println!("run_id={run_id}");
    if let Some(hash) = &report.config_hash {
        println!("config_hash={hash}");
    }
    println!("folds={}", report.folds.len());
    for s in &report.strategies {
        println!(
            "strategy={} candidates={} evaluated={} errors={} passed={}",
            s.name, s.expanded_grid_size, s.n_evaluated, s.n_errors, s.n_passed
        );
    }
    println!("report_path={}", report_path.display());

    let Some(winner) = &report.winner else {
        bail!(
            "no viable strategy: no candidate passed dd_cap={} fold_pass_rate={} min_exposure={}",
            cfg.constraints.dd_cap,
            cfg.constraints.fold_pass_rate,
            cfg.constraints.min_exposure
        );
    };

    println!("winner={}", winner.strategy);
    println!("winner_params={}", winner.params);
    println!("winner_stitched_max_drawdown={:.6}", winner.stitched_max_drawdown);
    print_metrics("oos_avg", &winner.avg_metrics);
    if let Some(h) = &report.holdout {
        println!("holdout={}..{} rows={}", h.start, h.end, h.rows);
        print_metrics("holdout", &h.winner);
        print_metrics("holdout_buy_and_hold", &h.buy_and_hold);
    } else {
        println!("holdout=unavailable");
    }
    Ok(())
}
