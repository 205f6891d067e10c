//! Lagging indicators over close (and high/low for ATR).
//!
//! Every function returns a vector the same length as its input. Values
//! that are undefined for lack of history are `NaN`; comparisons against
//! `NaN` are false, which is what the strategy rules rely on.

use crate::types::{DataError, PriceSeries};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Exponentially weighted mean with smoothing factor `alpha`, recursive form:
/// `y[0] = x[0]`, `y[t] = (1 - alpha) * y[t-1] + alpha * x[t]`.
///
/// Leading `NaN` inputs stay `NaN`; a `NaN` after the first value carries the
/// previous mean forward.
pub fn ewm_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &x in values {
        let next = match (prev, x.is_nan()) {
            (None, true) => None,
            (None, false) => Some(x),
            (Some(p), true) => Some(p),
            (Some(p), false) => Some((1.0 - alpha) * p + alpha * x),
        };
        out.push(next.unwrap_or(f64::NAN));
        prev = next;
    }
    out
}

/// EMA with `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    ewm_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// `values[i] - values[i - lag]`; `NaN` for the first `lag` rows.
pub fn diff(values: &[f64], lag: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i >= lag {
                values[i] - values[i - lag]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Simple return `c[i] / c[i-1] - 1`; `NaN` on the first row.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                f64::NAN
            } else {
                values[i] / values[i - 1] - 1.0
            }
        })
        .collect()
}

/// `max(h - l, |h - prev_c|, |l - prev_c|)`; the first row is `h - l`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    (0..n)
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                return hl;
            }
            let pc = close[i - 1];
            [hl, (high[i] - pc).abs(), (low[i] - pc).abs()]
                .into_iter()
                .filter(|v| !v.is_nan())
                .fold(f64::NAN, f64::max)
        })
        .collect()
}

/// EMA of the true range with span `period`.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    ema(&true_range(high, low, close), period)
}

/// Wilder RSI (`alpha = 1 / period`). `NaN` while the average loss is zero.
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let d = diff(close, 1);
    let gains: Vec<f64> = d.iter().map(|&x| if x > 0.0 { x } else { 0.0 }).collect();
    let losses: Vec<f64> = d.iter().map(|&x| if x < 0.0 { -x } else { 0.0 }).collect();
    let alpha = 1.0 / period as f64;
    let avg_gain = ewm_alpha(&gains, alpha);
    let avg_loss = ewm_alpha(&losses, alpha);
    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| {
            if l == 0.0 || l.is_nan() {
                f64::NAN
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect()
}

/// Sample standard deviation (ddof = 1) of a full window; `NaN` if any
/// value in the window is `NaN` or the window is shorter than 2.
fn window_std(window: &[f64]) -> f64 {
    if window.len() < 2 || window.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

/// Annualized rolling volatility of daily returns over `window` rows.
pub fn realized_vol(close: &[f64], window: usize) -> Vec<f64> {
    let r = pct_change(close);
    let ann = TRADING_DAYS_PER_YEAR.sqrt();
    (0..r.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                f64::NAN
            } else {
                window_std(&r[i + 1 - window..=i]) * ann
            }
        })
        .collect()
}

/// Max over the trailing `window` rows (inclusive); `NaN` until the window is full.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return f64::NAN;
            }
            let w = &values[i + 1 - window..=i];
            if w.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        })
        .collect()
}

/// Attach the shared indicator columns used across the catalog:
/// `EMA_{10,20,50,100,150,200}`, `ATR_{14,20}`, `RSI_14`, `RealVol_20`.
pub fn add_indicators(series: &mut PriceSeries) -> Result<(), DataError> {
    let close = series.closes();
    let high = series.highs();
    let low = series.lows();

    for span in [10usize, 20, 50, 100, 150, 200] {
        series.set_indicator(format!("EMA_{span}"), ema(&close, span))?;
    }
    for period in [14usize, 20] {
        series.set_indicator(format!("ATR_{period}"), atr(&high, &low, &close, period))?;
    }
    series.set_indicator("RSI_14", rsi(&close, 14))?;
    series.set_indicator("RealVol_20", realized_vol(&close, 20))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_to(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let e = ema(&[10.0, 20.0, 20.0], 3);
        assert!(close_to(e[0], 10.0));
        assert!(close_to(e[1], 15.0));
        assert!(close_to(e[2], 17.5));
    }

    #[test]
    fn ema_leading_nan_stays_nan() {
        let e = ewm_alpha(&[f64::NAN, 2.0, f64::NAN, 4.0], 0.5);
        assert!(e[0].is_nan());
        assert!(close_to(e[1], 2.0));
        assert!(close_to(e[2], 2.0));
        assert!(close_to(e[3], 3.0));
    }

    #[test]
    fn true_range_uses_prev_close_gaps() {
        let tr = true_range(&[10.0, 12.0], &[9.0, 11.5], &[9.5, 12.0]);
        assert!(close_to(tr[0], 1.0));
        // gap up: |12 - 9.5| dominates
        assert!(close_to(tr[1], 2.5));
    }

    #[test]
    fn rolling_max_waits_for_full_window() {
        let m = rolling_max(&[1.0, 3.0, 2.0, 0.5], 2);
        assert!(m[0].is_nan());
        assert_eq!(&m[1..], &[3.0, 3.0, 2.0]);
    }

    #[test]
    fn realized_vol_of_constant_growth_is_zero() {
        let c: Vec<f64> = (0..30).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let v = realized_vol(&c, 20);
        assert!(v[19].is_nan());
        assert!(v[20].abs() < 1e-9);
    }

    #[test]
    fn rsi_is_nan_without_losses_and_bounded_otherwise() {
        let up: Vec<f64> = (1..20).map(|i| i as f64).collect();
        assert!(rsi(&up, 14).iter().all(|v| v.is_nan()));

        let zig = [10.0, 11.0, 10.5, 11.5, 11.0, 12.0];
        let r = rsi(&zig, 14);
        assert!(r[2..].iter().all(|v| *v > 0.0 && *v < 100.0));
    }

    #[test]
    fn diff_lags() {
        let d = diff(&[1.0, 2.0, 4.0], 2);
        assert!(d[0].is_nan() && d[1].is_nan());
        assert!(close_to(d[2], 3.0));
    }
}
