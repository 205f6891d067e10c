//! Deterministic synthetic price series for tests.
//!
//! Nothing here touches the network or the wall clock: every series is a pure
//! function of its arguments, laid out on a Mon-Fri business-day calendar.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use ddc_backtest::{add_indicators, load_price_csv, PriceBar, PriceSeries};

/// `NaiveDate` from parts.
///
/// # Panics
/// On an invalid calendar date (test input error).
pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(y, m, d) {
        Some(date) => date,
        None => panic!("invalid date {y}-{m:02}-{d:02}"),
    }
}

fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `n` consecutive weekdays starting on (or after) `start`.
pub fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut d = start;
    while out.len() < n {
        if is_weekday(d) {
            out.push(d);
        }
        match d.succ_opt() {
            Some(next) => d = next,
            None => break,
        }
    }
    out
}

/// Weekdays in `[start, end]`.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_weekday(*d))
        .collect()
}

/// Build bars around a close path: open = previous close, high/low bracket
/// open and close by 0.5%, constant volume.
///
/// # Panics
/// If `closes` is empty or contains a non-positive value.
pub fn series_from_closes(dates: &[NaiveDate], closes: &[f64]) -> PriceSeries {
    let bars: Vec<PriceBar> = dates
        .iter()
        .zip(closes)
        .enumerate()
        .map(|(i, (&d, &c))| {
            let open = if i == 0 { c } else { closes[i - 1] };
            let high = open.max(c) * 1.005;
            let low = open.min(c) * 0.995;
            PriceBar::new(d, open, high, low, c, 1_000_000.0)
        })
        .collect();
    match PriceSeries::new(bars) {
        Ok(s) => s,
        Err(e) => panic!("synthetic series is invalid: {e}"),
    }
}

/// Constant compounding drift: `close[i] = start_price * (1 + daily_drift)^i`.
pub fn trend_series(start: NaiveDate, n: usize, start_price: f64, daily_drift: f64) -> PriceSeries {
    let dates = business_days(start, n);
    let closes: Vec<f64> = (0..n)
        .map(|i| start_price * (1.0 + daily_drift).powi(i as i32))
        .collect();
    series_from_closes(&dates, &closes)
}

/// Upward drift with a triangular oscillation of `amplitude` (fraction of
/// price) and `period` bars. Produces regular pullbacks and regime flips.
pub fn sawtooth_series(
    start: NaiveDate,
    n: usize,
    period: usize,
    amplitude: f64,
    daily_drift: f64,
) -> PriceSeries {
    let dates = business_days(start, n);
    let period = period.max(2);
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let phase = (i % period) as f64 / period as f64;
            let tri = if phase < 0.5 {
                phase * 2.0
            } else {
                2.0 - phase * 2.0
            };
            let base = 100.0 * (1.0 + daily_drift).powi(i as i32);
            base * (1.0 + amplitude * (tri - 0.5))
        })
        .collect();
    series_from_closes(&dates, &closes)
}

/// Steady uptrend, then a linear decline of `crash_pct` over `crash_len`
/// bars starting at `crash_at`, then the uptrend resumes from the trough.
pub fn crash_series(
    start: NaiveDate,
    n: usize,
    daily_drift: f64,
    crash_at: usize,
    crash_len: usize,
    crash_pct: f64,
) -> PriceSeries {
    let dates = business_days(start, n);
    let crash_len = crash_len.max(1);
    let per_bar = (1.0 - crash_pct).powf(1.0 / crash_len as f64);
    let mut closes = Vec::with_capacity(n);
    let mut px = 100.0_f64;
    for i in 0..n {
        if i > 0 {
            if i >= crash_at && i < crash_at + crash_len {
                px *= per_bar;
            } else {
                px *= 1.0 + daily_drift;
            }
        }
        closes.push(px);
    }
    series_from_closes(&dates, &closes)
}

/// Attach the shared indicator columns.
///
/// # Panics
/// Never for a series produced by this crate.
pub fn with_indicators(mut series: PriceSeries) -> PriceSeries {
    if let Err(e) = add_indicators(&mut series) {
        panic!("add_indicators failed: {e}");
    }
    series
}

/// Load a CSV fixture and attach indicators.
pub fn load_fixture_csv(path: &str) -> Result<PriceSeries> {
    let mut s = load_price_csv(path).with_context(|| format!("load fixture csv: {path}"))?;
    add_indicators(&mut s).context("attach indicators")?;
    Ok(s)
}
