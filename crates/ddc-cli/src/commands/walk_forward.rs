//! `ddc walk-forward`: per-fold grid search, consensus params, holdout test.

use anyhow::{Context, Result};

use ddc_config::UnusedKeyPolicy;
use ddc_strategy::StrategyRegistry;
use ddc_walkforward::{final_test, walk_forward_optimize};

use super::{load_research_config, load_series, print_metrics};

pub fn run_walk_forward_cmd(data: &str, strategy: &str, config_paths: &[String]) -> Result<()> {
    let run = load_research_config(config_paths, UnusedKeyPolicy::Warn)?;
    let opts = run.config.walk_forward_options();

    let registry = StrategyRegistry::catalog();
    let entry = registry.get(strategy)?;
    let grid = (entry.grid)();

    let series = load_series(data)?;
    let report = walk_forward_optimize(&series, &entry.signal, &grid, &opts)
        .with_context(|| format!("walk-forward failed: {strategy}"))?;

    println!("walk_forward_ok=true");
    println!("strategy={}", entry.meta.name);
    if let Some(hash) = &run.config_hash {
        println!("config_hash={hash}");
    }
    println!("holdout_start={}", report.holdout_start);
    println!("folds_planned={}", report.folds.len());
    println!("folds_used={}", report.n_folds());
    for r in &report.fold_results {
        print!(
            "fold={} train={}..{} val={}..{} ",
            r.fold_index, r.fold.train_start, r.fold.train_end, r.fold.val_start, r.fold.val_end
        );
        println!(
            "is_score={:.6} oos_cagr={:.6} oos_max_drawdown={:.6} params={}",
            r.is_score, r.oos_metrics.cagr, r.oos_metrics.max_drawdown, r.best_params
        );
    }
    println!("consensus_params={}", report.best_params);
    if let Some(avg) = &report.oos_metrics_avg {
        print_metrics("oos_avg", avg);
    }

    match final_test(
        &series,
        &entry.signal,
        &report.best_params,
        report.holdout_start,
        &opts.cost,
    ) {
        Ok(h) => {
            println!("holdout_rows={}", h.rows);
            print_metrics("holdout", &h.metrics);
        }
        Err(e) => println!("holdout=unavailable reason={e}"),
    }
    Ok(())
}
