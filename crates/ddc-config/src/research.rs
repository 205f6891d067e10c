//! Typed view of a loaded research configuration.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ddc_backtest::{validate_cost_config, CostConfig, MetricKey};
use ddc_selection::{validate_risk_scales, ConstraintConfig, ResearchOptions};
use ddc_strategy::StrategyRegistry;
use ddc_walkforward::{FoldWindows, WalkForwardOptions};

use crate::LoadedConfig;

/// Catalog strategies evaluated when `strategies` is not set.
pub const DEFAULT_STRATEGIES: &[&str] = &[
    "F_hysteresis_regime",
    "G_sizing_regime",
    "H_atr_dip_addon",
    "I_breakout_or_dip",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardSection {
    pub train_years: u32,
    pub val_years: u32,
    pub step_years: u32,
    pub holdout_start: NaiveDate,
    /// Folds with fewer validation rows are recorded as failed.
    pub min_fold_rows: usize,
}

impl Default for WalkForwardSection {
    fn default() -> Self {
        let windows = FoldWindows::default();
        Self {
            train_years: windows.train_years,
            val_years: windows.val_years,
            step_years: windows.step_years,
            holdout_start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or(NaiveDate::MIN),
            min_fold_rows: ddc_walkforward::MIN_FOLD_ROWS,
        }
    }
}

/// Training filters for the walk-forward optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSection {
    pub objective: MetricKey,
    pub min_trades_per_year: f64,
    pub max_trades_per_year: f64,
    pub min_exposure_pct: f64,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        let wf = WalkForwardOptions::default();
        Self {
            objective: wf.objective,
            min_trades_per_year: wf.min_trades_per_year,
            max_trades_per_year: wf.max_trades_per_year,
            min_exposure_pct: wf.min_exposure_pct,
        }
    }
}

/// Every section is optional; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub costs: CostConfig,
    pub walk_forward: WalkForwardSection,
    pub constraints: ConstraintConfig,
    pub risk_scales: Vec<f64>,
    pub strategies: Vec<String>,
    pub optimizer: OptimizerSection,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            costs: CostConfig::default(),
            walk_forward: WalkForwardSection::default(),
            constraints: ConstraintConfig::default(),
            risk_scales: vec![0.5, 0.6, 0.7, 0.8, 0.9, 1.0],
            strategies: DEFAULT_STRATEGIES.iter().map(|s| s.to_string()).collect(),
            optimizer: OptimizerSection::default(),
        }
    }
}

impl ResearchConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let cfg: ResearchConfig = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the research schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        validate_cost_config(&self.costs).context("invalid costs")?;
        self.fold_windows()
            .validate()
            .context("invalid walk_forward")?;
        if self.walk_forward.min_fold_rows == 0 {
            bail!("invalid walk_forward: min_fold_rows must be >= 1");
        }
        self.constraints
            .validate()
            .context("invalid constraints")?;
        validate_risk_scales(&self.risk_scales).context("invalid risk_scales")?;

        if self.strategies.is_empty() {
            bail!("invalid strategies: at least one strategy is required");
        }
        let registry = StrategyRegistry::catalog();
        for name in &self.strategies {
            registry.get(name).context("invalid strategies")?;
        }
        Ok(())
    }

    pub fn fold_windows(&self) -> FoldWindows {
        FoldWindows {
            train_years: self.walk_forward.train_years,
            val_years: self.walk_forward.val_years,
            step_years: self.walk_forward.step_years,
        }
    }

    pub fn research_options(&self) -> ResearchOptions {
        ResearchOptions {
            cost: self.costs,
            constraints: self.constraints,
            min_fold_rows: self.walk_forward.min_fold_rows,
        }
    }

    pub fn walk_forward_options(&self) -> WalkForwardOptions {
        WalkForwardOptions {
            windows: self.fold_windows(),
            holdout_start: Some(self.walk_forward.holdout_start),
            cost: self.costs,
            objective: self.optimizer.objective,
            min_trades_per_year: self.optimizer.min_trades_per_year,
            max_trades_per_year: self.optimizer.max_trades_per_year,
            min_exposure_pct: self.optimizer.min_exposure_pct,
            ..WalkForwardOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ResearchConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.strategies.len(), 4);
        assert_eq!(cfg.risk_scales.len(), 6);
        assert_eq!(cfg.optimizer.objective, MetricKey::Calmar);
    }

    #[test]
    fn options_carry_sections_through() {
        let mut cfg = ResearchConfig::default();
        cfg.walk_forward.min_fold_rows = 150;
        cfg.constraints.dd_cap = -0.15;
        let ro = cfg.research_options();
        assert_eq!(ro.min_fold_rows, 150);
        assert_eq!(ro.constraints.dd_cap, -0.15);

        let wf = cfg.walk_forward_options();
        assert_eq!(wf.holdout_start, NaiveDate::from_ymd_opt(2022, 1, 1));
        assert_eq!(wf.windows, FoldWindows::default());
    }
}
