use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::engine::drawdown_values;
use crate::indicators::TRADING_DAYS_PER_YEAR;
use crate::types::{DailySeries, Trade};

// ============================================================================
// Metric keys
// ============================================================================

/// The fixed metric key set. Order here is the serialization and report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKey {
    #[serde(rename = "CAGR")]
    Cagr,
    Volatility,
    Sharpe,
    Sortino,
    MaxDrawdown,
    Calmar,
    WinRate,
    ProfitFactor,
    ExposurePct,
    AvgTradeDuration,
    TradesPerYear,
    TotalTrades,
    TotalReturn,
    NumYears,
}

impl MetricKey {
    pub const ALL: [MetricKey; 14] = [
        MetricKey::Cagr,
        MetricKey::Volatility,
        MetricKey::Sharpe,
        MetricKey::Sortino,
        MetricKey::MaxDrawdown,
        MetricKey::Calmar,
        MetricKey::WinRate,
        MetricKey::ProfitFactor,
        MetricKey::ExposurePct,
        MetricKey::AvgTradeDuration,
        MetricKey::TradesPerYear,
        MetricKey::TotalTrades,
        MetricKey::TotalReturn,
        MetricKey::NumYears,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::Cagr => "CAGR",
            MetricKey::Volatility => "Volatility",
            MetricKey::Sharpe => "Sharpe",
            MetricKey::Sortino => "Sortino",
            MetricKey::MaxDrawdown => "MaxDrawdown",
            MetricKey::Calmar => "Calmar",
            MetricKey::WinRate => "WinRate",
            MetricKey::ProfitFactor => "ProfitFactor",
            MetricKey::ExposurePct => "ExposurePct",
            MetricKey::AvgTradeDuration => "AvgTradeDuration",
            MetricKey::TradesPerYear => "TradesPerYear",
            MetricKey::TotalTrades => "TotalTrades",
            MetricKey::TotalReturn => "TotalReturn",
            MetricKey::NumYears => "NumYears",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown metric: {s}"))
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Performance summary of one equity curve and its trades.
///
/// `TotalTrades` is carried as `f64` so fold averages share the same shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "CAGR")]
    pub cagr: f64,
    #[serde(rename = "Volatility")]
    pub volatility: f64,
    #[serde(rename = "Sharpe")]
    pub sharpe: f64,
    #[serde(rename = "Sortino")]
    pub sortino: f64,
    #[serde(rename = "MaxDrawdown")]
    pub max_drawdown: f64,
    #[serde(rename = "Calmar")]
    pub calmar: f64,
    #[serde(rename = "WinRate")]
    pub win_rate: f64,
    /// `+inf` when there are trades but no losing return. Written as JSON
    /// `null` and read back as `+inf`.
    #[serde(rename = "ProfitFactor", with = "unbounded_profit_factor")]
    pub profit_factor: f64,
    #[serde(rename = "ExposurePct")]
    pub exposure_pct: f64,
    #[serde(rename = "AvgTradeDuration")]
    pub avg_trade_duration: f64,
    #[serde(rename = "TradesPerYear")]
    pub trades_per_year: f64,
    #[serde(rename = "TotalTrades")]
    pub total_trades: f64,
    #[serde(rename = "TotalReturn")]
    pub total_return: f64,
    #[serde(rename = "NumYears")]
    pub num_years: f64,
}

mod unbounded_profit_factor {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

impl Metrics {
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::Cagr => self.cagr,
            MetricKey::Volatility => self.volatility,
            MetricKey::Sharpe => self.sharpe,
            MetricKey::Sortino => self.sortino,
            MetricKey::MaxDrawdown => self.max_drawdown,
            MetricKey::Calmar => self.calmar,
            MetricKey::WinRate => self.win_rate,
            MetricKey::ProfitFactor => self.profit_factor,
            MetricKey::ExposurePct => self.exposure_pct,
            MetricKey::AvgTradeDuration => self.avg_trade_duration,
            MetricKey::TradesPerYear => self.trades_per_year,
            MetricKey::TotalTrades => self.total_trades,
            MetricKey::TotalReturn => self.total_return,
            MetricKey::NumYears => self.num_years,
        }
    }

    pub fn set(&mut self, key: MetricKey, value: f64) {
        let slot = match key {
            MetricKey::Cagr => &mut self.cagr,
            MetricKey::Volatility => &mut self.volatility,
            MetricKey::Sharpe => &mut self.sharpe,
            MetricKey::Sortino => &mut self.sortino,
            MetricKey::MaxDrawdown => &mut self.max_drawdown,
            MetricKey::Calmar => &mut self.calmar,
            MetricKey::WinRate => &mut self.win_rate,
            MetricKey::ProfitFactor => &mut self.profit_factor,
            MetricKey::ExposurePct => &mut self.exposure_pct,
            MetricKey::AvgTradeDuration => &mut self.avg_trade_duration,
            MetricKey::TradesPerYear => &mut self.trades_per_year,
            MetricKey::TotalTrades => &mut self.total_trades,
            MetricKey::TotalReturn => &mut self.total_return,
            MetricKey::NumYears => &mut self.num_years,
        };
        *slot = value;
    }

    /// Per-key mean over the finite values only; a key with no finite value is 0.0.
    pub fn mean_of_finite<'a>(items: impl IntoIterator<Item = &'a Metrics>) -> Metrics {
        let items: Vec<&Metrics> = items.into_iter().collect();
        let mut out = Metrics::default();
        for key in MetricKey::ALL {
            let vals: Vec<f64> = items
                .iter()
                .map(|m| m.get(key))
                .filter(|v| v.is_finite())
                .collect();
            let mean = if vals.is_empty() {
                0.0
            } else {
                vals.iter().sum::<f64>() / vals.len() as f64
            };
            out.set(key, mean);
        }
        out
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  CAGR:             {:.2}%", self.cagr * 100.0)?;
        writeln!(f, "  Volatility:       {:.2}%", self.volatility * 100.0)?;
        writeln!(f, "  Sharpe:           {:.2}", self.sharpe)?;
        writeln!(f, "  Sortino:          {:.2}", self.sortino)?;
        writeln!(f, "  Max Drawdown:     {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "  Calmar:           {:.2}", self.calmar)?;
        writeln!(f, "  Win Rate:         {:.1}%", self.win_rate * 100.0)?;
        writeln!(f, "  Profit Factor:    {:.2}", self.profit_factor)?;
        writeln!(f, "  Exposure:         {:.1}%", self.exposure_pct)?;
        writeln!(f, "  Avg Trade Days:   {:.1}", self.avg_trade_duration)?;
        writeln!(f, "  Trades/Year:      {:.1}", self.trades_per_year)?;
        write!(f, "  Total Return:     {:.2}%", self.total_return * 100.0)
    }
}

// ============================================================================
// Computation
// ============================================================================

/// [`compute_metrics_with_risk_free`] with a zero risk-free rate.
pub fn compute_metrics(equity: &[(NaiveDate, f64)], trades: &[Trade]) -> Metrics {
    compute_metrics_with_risk_free(equity, trades, 0.0)
}

/// Compute the fixed metric set from an equity curve and its trades.
///
/// `risk_free` is an annual rate. Every ratio falls back to 0.0 on a zero
/// denominator, except profit factor which is `+inf` with trades but no losses.
pub fn compute_metrics_with_risk_free(
    equity: &[(NaiveDate, f64)],
    trades: &[Trade],
    risk_free: f64,
) -> Metrics {
    if equity.is_empty() {
        return Metrics::default();
    }

    let eq: Vec<f64> = equity.iter().map(|&(_, e)| e).collect();
    let returns: Vec<f64> = eq.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let n_days = returns.len();
    let n_years = n_days as f64 / TRADING_DAYS_PER_YEAR;

    let total_return = eq[eq.len() - 1] / eq[0];
    let cagr = if n_days < TRADING_DAYS_PER_YEAR as usize {
        0.0
    } else if total_return <= 0.0 {
        -1.0
    } else {
        total_return.powf(1.0 / n_years) - 1.0
    };

    let ann = TRADING_DAYS_PER_YEAR.sqrt();
    let volatility = sample_std(&returns).map(|s| s * ann).unwrap_or(0.0);

    let daily_rf = risk_free / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let sharpe = match (mean(&excess), sample_std(&excess)) {
        (Some(m), Some(s)) if s > 0.0 => m / s * ann,
        _ => 0.0,
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_dev = sample_std(&downside).map(|s| s * ann).unwrap_or(0.0);
    let sortino = match mean(&returns) {
        Some(m) if downside_dev > 0.0 => (m * TRADING_DAYS_PER_YEAR - risk_free) / downside_dev,
        _ => 0.0,
    };

    let max_drawdown = drawdown_values(&eq).into_iter().fold(0.0_f64, f64::min);
    let calmar = if max_drawdown.abs() > 1e-10 {
        cagr / max_drawdown.abs()
    } else {
        0.0
    };

    let n_trades = trades.len();
    let trades_per_year = if n_years > 0.0 {
        n_trades as f64 / n_years
    } else {
        0.0
    };

    let (win_rate, profit_factor, avg_trade_duration) = if n_trades > 0 {
        let winners: Vec<f64> = trades
            .iter()
            .map(|t| t.cumulative_return)
            .filter(|r| *r > 0.0)
            .collect();
        let gross_profit: f64 = winners.iter().sum();
        let gross_loss: f64 = trades
            .iter()
            .map(|t| t.cumulative_return)
            .filter(|r| *r <= 0.0)
            .sum::<f64>()
            .abs();
        let pf = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };
        let avg_bars =
            trades.iter().map(|t| t.bars_held as f64).sum::<f64>() / n_trades as f64;
        (winners.len() as f64 / n_trades as f64, pf, avg_bars)
    } else {
        (0.0, 0.0, 0.0)
    };

    let days_in_market: usize = trades.iter().map(|t| t.bars_held).sum();
    let exposure_pct = if n_days > 0 {
        days_in_market as f64 / n_days as f64 * 100.0
    } else {
        0.0
    };

    Metrics {
        cagr,
        volatility,
        sharpe,
        sortino,
        max_drawdown,
        calmar,
        win_rate,
        profit_factor,
        exposure_pct,
        avg_trade_duration,
        trades_per_year,
        total_trades: n_trades as f64,
        total_return: total_return - 1.0,
        num_years: n_years,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (ddof = 1); `None` below two observations.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

// ============================================================================
// Curve helpers
// ============================================================================

/// Drawdown from running peak for each point of an equity curve.
pub fn drawdown_series(equity: &[(NaiveDate, f64)]) -> DailySeries {
    let values: Vec<f64> = equity.iter().map(|&(_, e)| e).collect();
    equity
        .iter()
        .map(|&(d, _)| d)
        .zip(drawdown_values(&values))
        .collect()
}

/// One calendar year of month-end to month-end returns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturnsRow {
    pub year: i32,
    /// Index 0 = January. `None` where no return is defined (first month, gaps).
    pub months: [Option<f64>; 12],
    /// Year-end to year-end return; `None` for the first year.
    pub annual: Option<f64>,
}

/// Rows = years, columns = months. The first month and the first year have
/// no prior period and are left empty.
pub fn monthly_returns_table(equity: &[(NaiveDate, f64)]) -> Vec<MonthlyReturnsRow> {
    // Last equity per (year, month) and per year.
    let mut month_end: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    let mut year_end: BTreeMap<i32, f64> = BTreeMap::new();
    for &(d, e) in equity {
        month_end.insert((d.year(), d.month()), e);
        year_end.insert(d.year(), e);
    }

    let mut rows: BTreeMap<i32, MonthlyReturnsRow> = BTreeMap::new();
    let months: Vec<((i32, u32), f64)> = month_end.into_iter().collect();
    for w in months.windows(2) {
        let ((y, m), e) = w[1];
        let prev = w[0].1;
        let row = rows.entry(y).or_insert_with(|| MonthlyReturnsRow {
            year: y,
            months: [None; 12],
            annual: None,
        });
        row.months[(m - 1) as usize] = Some(e / prev - 1.0);
    }

    let years: Vec<(i32, f64)> = year_end.into_iter().collect();
    for w in years.windows(2) {
        let (y, e) = w[1];
        if let Some(row) = rows.get_mut(&y) {
            row.annual = Some(e / w[0].1 - 1.0);
        }
    }

    rows.into_values().collect()
}
