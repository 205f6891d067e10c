use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A date-indexed series of values, ascending by date.
pub type DailySeries = Vec<(NaiveDate, f64)>;

/// Weights at or below this are treated as flat.
pub const POSITION_EPSILON: f64 = 1e-8;

// ---------------------------------------------------------------------------
// Costs
// ---------------------------------------------------------------------------

/// Per-side trading costs and starting capital.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Commission in basis points per side (1 bps = 0.01%).
    pub commission_bps: f64,
    /// Slippage in basis points per side.
    pub slippage_bps: f64,
    pub initial_capital: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            commission_bps: 1.0,
            slippage_bps: 2.0,
            initial_capital: 100_000.0,
        }
    }
}

impl CostConfig {
    /// Total one-way cost as a fraction of notional traded.
    pub fn one_way_cost(&self) -> f64 {
        (self.commission_bps + self.slippage_bps) / 10_000.0
    }

    /// Zero-cost config, mostly useful in tests.
    pub fn frictionless(initial_capital: f64) -> Self {
        Self {
            commission_bps: 0.0,
            slippage_bps: 0.0,
            initial_capital,
        }
    }
}

// ---------------------------------------------------------------------------
// Price data
// ---------------------------------------------------------------------------

/// One daily OHLCV row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Errors raised when a price series violates its shape invariants.
#[derive(Clone, Debug, PartialEq)]
pub enum DataError {
    Empty,
    /// Dates must be strictly increasing (no duplicates).
    NonIncreasingDates { index: usize, date: NaiveDate },
    InvalidClose { date: NaiveDate, value: f64 },
    IndicatorLength {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Empty => write!(f, "price series is empty"),
            DataError::NonIncreasingDates { index, date } => {
                write!(f, "dates not strictly increasing at row {}: {}", index, date)
            }
            DataError::InvalidClose { date, value } => {
                write!(f, "close must be finite and > 0 at {}: {}", date, value)
            }
            DataError::IndicatorLength {
                name,
                expected,
                got,
            } => write!(
                f,
                "indicator {} has {} values, series has {} rows",
                name, got, expected
            ),
        }
    }
}

impl std::error::Error for DataError {}

/// Ordered, date-indexed daily bars plus precomputed indicator columns.
///
/// Immutable once built: every constructor validates that the series is
/// non-empty, dates strictly increase, and closes are finite and positive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceSeries")]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
    indicators: BTreeMap<String, Vec<f64>>,
}

/// Unchecked wire shape of [`PriceSeries`]; only reachable through `TryFrom`.
/// Indicator warm-up NaNs are written as `null`.
#[derive(Deserialize)]
struct RawPriceSeries {
    bars: Vec<PriceBar>,
    #[serde(default)]
    indicators: BTreeMap<String, Vec<Option<f64>>>,
}

impl TryFrom<RawPriceSeries> for PriceSeries {
    type Error = DataError;

    fn try_from(raw: RawPriceSeries) -> Result<Self, Self::Error> {
        let mut series = PriceSeries::new(raw.bars)?;
        for (name, values) in raw.indicators {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            series.set_indicator(name, values)?;
        }
        Ok(series)
    }
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, DataError> {
        if bars.is_empty() {
            return Err(DataError::Empty);
        }
        for (i, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(DataError::InvalidClose {
                    date: bar.date,
                    value: bar.close,
                });
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(DataError::NonIncreasingDates {
                    index: i,
                    date: bar.date,
                });
            }
        }
        Ok(Self {
            bars,
            indicators: BTreeMap::new(),
        })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn indicator(&self, name: &str) -> Option<&[f64]> {
        self.indicators.get(name).map(|v| v.as_slice())
    }

    pub fn indicator_names(&self) -> impl Iterator<Item = &str> {
        self.indicators.keys().map(|k| k.as_str())
    }

    /// Attach (or replace) an indicator column aligned with the bars.
    pub fn set_indicator(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), DataError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(DataError::IndicatorLength {
                name,
                expected: self.bars.len(),
                got: values.len(),
            });
        }
        self.indicators.insert(name, values);
        Ok(())
    }

    /// Rows with `start <= date <= end`, indicators sliced alongside.
    /// Returns `None` when no row falls inside the range.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries> {
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date <= end);
        self.slice_rows(lo, hi)
    }

    /// Rows on or after `start`.
    pub fn slice_from(&self, start: NaiveDate) -> Option<PriceSeries> {
        let lo = self.bars.partition_point(|b| b.date < start);
        self.slice_rows(lo, self.bars.len())
    }

    fn slice_rows(&self, lo: usize, hi: usize) -> Option<PriceSeries> {
        if lo >= hi {
            return None;
        }
        let indicators = self
            .indicators
            .iter()
            .map(|(k, v)| (k.clone(), v[lo..hi].to_vec()))
            .collect();
        Some(PriceSeries {
            bars: self.bars[lo..hi].to_vec(),
            indicators,
        })
    }
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// Clamp a raw weight into [0, 1]; NaN becomes flat.
pub fn clamp_weight(w: f64) -> f64 {
    if w.is_nan() {
        0.0
    } else {
        w.clamp(0.0, 1.0)
    }
}

/// Target weight per date, as produced by a strategy.
///
/// Values are not trusted: [`Signal::reindex`] aligns them to a series,
/// fills missing dates with 0.0 and clamps to [0, 1].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    points: DailySeries,
}

impl Signal {
    pub fn new(points: DailySeries) -> Self {
        Self { points }
    }

    /// Pair each bar's date with the weight at the same position.
    /// Extra weights are dropped; missing trailing weights read as 0.0.
    pub fn from_weights(series: &PriceSeries, weights: Vec<f64>) -> Self {
        let points = series
            .bars()
            .iter()
            .zip(weights)
            .map(|(b, w)| (b.date, w))
            .collect();
        Self { points }
    }

    /// Constant weight on every date of `series`.
    pub fn constant(series: &PriceSeries, weight: f64) -> Self {
        Self::from_weights(series, vec![weight; series.len()])
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Multiply every weight by `risk_scale`, then clamp to [0, 1].
    pub fn scaled(&self, risk_scale: f64) -> Signal {
        let points = self
            .points
            .iter()
            .map(|&(d, w)| (d, clamp_weight(w * risk_scale)))
            .collect();
        Signal { points }
    }

    /// One clamped weight per bar of `series`; dates absent from the signal are 0.0.
    pub fn reindex(&self, series: &PriceSeries) -> Vec<f64> {
        let aligned = self.points.len() == series.len()
            && self
                .points
                .iter()
                .zip(series.bars())
                .all(|((d, _), b)| *d == b.date);
        if aligned {
            return self.points.iter().map(|&(_, w)| clamp_weight(w)).collect();
        }

        let lookup: BTreeMap<NaiveDate, f64> = self.points.iter().copied().collect();
        series
            .bars()
            .iter()
            .map(|b| lookup.get(&b.date).copied().map(clamp_weight).unwrap_or(0.0))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One maximal run of non-flat position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    /// Last day actually held.
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Sum of cost-adjusted daily strategy returns while held.
    pub cumulative_return: f64,
    pub bars_held: usize,
}

/// Output of a single backtest run. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub equity: DailySeries,
    /// Fraction below running peak; always in (-1, 0].
    pub drawdown: DailySeries,
    pub trades: Vec<Trade>,
    /// Weight held on each date (signal lagged by one bar).
    pub positions: DailySeries,
    /// Cost-adjusted strategy return per date.
    pub daily_returns: DailySeries,
}

impl BacktestResult {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity.last().map(|&(_, e)| e)
    }

    pub fn max_drawdown(&self) -> f64 {
        self.drawdown
            .iter()
            .map(|&(_, d)| d)
            .fold(0.0_f64, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(d(2020, 1, 1 + i as u32), c, c, c, c, 1.0))
            .collect()
    }

    #[test]
    fn one_way_cost_combines_both_sides() {
        let c = CostConfig::default();
        assert!((c.one_way_cost() - 0.0003).abs() < 1e-15);
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let mut b = bars(&[1.0, 2.0]);
        b[1].date = b[0].date;
        assert!(matches!(
            PriceSeries::new(b),
            Err(DataError::NonIncreasingDates { index: 1, .. })
        ));
    }

    #[test]
    fn series_rejects_empty_and_bad_close() {
        assert_eq!(PriceSeries::new(vec![]), Err(DataError::Empty));
        assert!(PriceSeries::new(bars(&[1.0, f64::NAN])).is_err());
        assert!(PriceSeries::new(bars(&[1.0, 0.0])).is_err());
    }

    #[test]
    fn slice_is_inclusive_and_carries_indicators() {
        let mut s = PriceSeries::new(bars(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        s.set_indicator("X", vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        let sub = s.slice(d(2020, 1, 2), d(2020, 1, 3)).unwrap();
        assert_eq!(sub.closes(), vec![2.0, 3.0]);
        assert_eq!(sub.indicator("X"), Some(&[20.0, 30.0][..]));
        assert!(s.slice(d(2021, 1, 1), d(2021, 2, 1)).is_none());
    }

    #[test]
    fn deserialize_runs_constructor_checks() {
        let empty = serde_json::from_str::<PriceSeries>(r#"{"bars":[],"indicators":{}}"#);
        assert!(empty.is_err());

        let sorted = PriceSeries::new(bars(&[1.0, 2.0])).unwrap();
        let mut unsorted = serde_json::to_value(&sorted).unwrap();
        unsorted["bars"][1]["date"] = serde_json::json!("2019-12-31");
        assert!(serde_json::from_value::<PriceSeries>(unsorted).is_err());

        let mut short = PriceSeries::new(bars(&[1.0, 2.0])).unwrap();
        short.set_indicator("X", vec![1.0, 2.0]).unwrap();
        let mut v = serde_json::to_value(&short).unwrap();
        v["indicators"]["X"] = serde_json::json!([1.0]);
        assert!(serde_json::from_value::<PriceSeries>(v).is_err());
    }

    #[test]
    fn deserialize_keeps_indicator_warmup_nan() {
        let mut s = PriceSeries::new(bars(&[1.0, 2.0, 3.0])).unwrap();
        s.set_indicator("X", vec![f64::NAN, 5.0, 6.0]).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back.closes(), s.closes());
        let x = back.indicator("X").unwrap();
        assert!(x[0].is_nan());
        assert_eq!(&x[1..], &[5.0, 6.0]);
    }

    #[test]
    fn set_indicator_checks_length() {
        let mut s = PriceSeries::new(bars(&[1.0, 2.0])).unwrap();
        assert!(s.set_indicator("X", vec![1.0]).is_err());
    }

    #[test]
    fn reindex_fills_missing_and_clamps() {
        let s = PriceSeries::new(bars(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let sig = Signal::new(vec![
            (d(2020, 1, 1), 1.5),
            (d(2020, 1, 3), f64::NAN),
            (d(2020, 1, 4), -0.5),
        ]);
        assert_eq!(sig.reindex(&s), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn scaled_clamps_after_multiplying() {
        let s = PriceSeries::new(bars(&[1.0, 2.0])).unwrap();
        let sig = Signal::from_weights(&s, vec![1.0, 0.4]).scaled(0.5);
        assert_eq!(sig.reindex(&s), vec![0.5, 0.2]);
        let up = Signal::from_weights(&s, vec![0.8, 0.4]).scaled(2.0);
        assert_eq!(up.reindex(&s), vec![1.0, 0.8]);
    }
}
