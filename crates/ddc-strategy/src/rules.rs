//! Building blocks shared by the catalog: boolean masks over indicator
//! columns and the per-bar state machines.
//!
//! Masks treat `NaN` as false, so warm-up rows never trigger an entry.

use ddc_backtest::indicators::{diff, ema};

pub(crate) fn gt(a: &[f64], b: &[f64]) -> Vec<bool> {
    a.iter().zip(b).map(|(x, y)| x > y).collect()
}

/// `close <= base * (1 + pct / 100)` per row.
pub(crate) fn within_pct_above(close: &[f64], base: &[f64], pct: f64) -> Vec<bool> {
    let k = 1.0 + pct / 100.0;
    close.iter().zip(base).map(|(c, b)| *c <= b * k).collect()
}

/// EMA rose over the last `window` rows. `None` window (0) means no filter.
pub(crate) fn slope_positive(ema_values: &[f64], window: usize) -> Option<Vec<bool>> {
    if window == 0 {
        return None;
    }
    Some(diff(ema_values, window).iter().map(|d| *d > 0.0).collect())
}

pub(crate) fn and(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(x, y)| *x && *y).collect()
}

pub(crate) fn or(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(x, y)| *x || *y).collect()
}

/// `close > EMA(regime_len)`, optionally AND'd with a positive EMA slope.
pub(crate) fn regime_mask(
    close: &[f64],
    regime_len: usize,
    slope_window: usize,
) -> (Vec<bool>, Vec<f64>) {
    let e = ema(close, regime_len);
    let above = gt(close, &e);
    let mask = match slope_positive(&e, slope_window) {
        Some(slope) => and(&above, &slope),
        None => above,
    };
    (mask, e)
}

pub(crate) fn to_weights(mask: &[bool]) -> Vec<f64> {
    mask.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()
}

// ---------------------------------------------------------------------------
// State machines
// ---------------------------------------------------------------------------

/// Enter on `entry`, stay while `stay` holds.
pub(crate) fn enter_and_hold(entry: &[bool], stay: &[bool]) -> Vec<f64> {
    let mut in_position = false;
    (0..entry.len())
        .map(|i| {
            if !in_position {
                if entry[i] {
                    in_position = true;
                }
            } else if !stay[i] {
                in_position = false;
            }
            if in_position {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Enter on `entry`; exit when close falls under
/// `highest_close_since_entry - atr_mult * atr` or `stay` breaks.
pub(crate) fn trailing_stop(
    close: &[f64],
    atr: &[f64],
    atr_mult: f64,
    entry: &[bool],
    stay: &[bool],
) -> Vec<f64> {
    let mut in_position = false;
    let mut highest_close = 0.0_f64;
    let mut out = Vec::with_capacity(close.len());

    for i in 0..close.len() {
        let c = close[i];
        if !in_position {
            if entry[i] {
                in_position = true;
                highest_close = c;
            }
        } else {
            highest_close = highest_close.max(c);
            let stop_level = highest_close - atr_mult * atr[i];
            if c < stop_level || !stay[i] {
                in_position = false;
            }
        }
        out.push(if in_position { 1.0 } else { 0.0 });
    }
    out
}

/// Enter above `upper`, exit below `lower`; in between the previous state holds.
pub(crate) fn hysteresis(
    close: &[f64],
    upper: &[f64],
    lower: &[f64],
    entry_ok: &[bool],
) -> Vec<f64> {
    let mut in_position = false;
    (0..close.len())
        .map(|i| {
            let c = close[i];
            if !in_position {
                if c > upper[i] && entry_ok[i] {
                    in_position = true;
                }
            } else if c < lower[i] {
                in_position = false;
            }
            if in_position {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Base weight in regime plus an add-on held from a dip until close
/// recovers above `dip_ref` or the regime breaks.
pub(crate) fn dip_addon(
    close: &[f64],
    dip_ref: &[f64],
    in_regime: &[bool],
    in_dip: &[bool],
    base_weight: f64,
    addon_weight: f64,
) -> Vec<f64> {
    let mut holding_addon = false;
    (0..close.len())
        .map(|i| {
            if !in_regime[i] {
                holding_addon = false;
                return 0.0;
            }
            let mut w = base_weight;
            if in_dip[i] {
                holding_addon = true;
            }
            if holding_addon {
                if close[i] > dip_ref[i] {
                    holding_addon = false;
                } else {
                    w = (base_weight + addon_weight).min(1.0);
                }
            }
            w
        })
        .collect()
}
