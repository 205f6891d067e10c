//! Built-in EMA-centric trend strategies (A-I) and their base parameter grids.
//!
//! Binary strategies emit 0/1; `G` and `H` emit fractional weights. All
//! indicators are recomputed on the series handed in, so a fold slice sees
//! only its own warm-up.

use ddc_backtest::indicators::{atr, ema, realized_vol, rolling_max};
use ddc_backtest::{PriceSeries, Signal};

use crate::rules::{
    and, dip_addon, enter_and_hold, gt, hysteresis, or, regime_mask, slope_positive, to_weights,
    trailing_stop, within_pct_above,
};
use crate::{Params, StrategyError, StrategyMeta, StrategyRegistry};

// ============================================================================
// A: EMA fast/slow crossover
// ============================================================================

/// Long while `EMA(fast) > EMA(slow)`.
pub fn ema_crossover(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let fast = params.get_span("fast")?;
    let slow = params.get_span("slow")?;
    let close = series.closes();
    let mask = gt(&ema(&close, fast), &ema(&close, slow));
    Ok(Signal::from_weights(series, to_weights(&mask)))
}

pub fn ema_crossover_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for fast in [10, 20, 30, 50] {
        for slow in [50, 100, 150, 200] {
            if fast < slow {
                grid.push(Params::new().with("fast", fast).with("slow", slow));
            }
        }
    }
    grid
}

// ============================================================================
// B: regime filter
// ============================================================================

/// Long while close is above `EMA(regime_len)` and, unless `slope_window`
/// is 0, that EMA has risen over the last `slope_window` bars.
pub fn regime_filter(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let slope_window = params.get_usize("slope_window")?;
    let (mask, _) = regime_mask(&series.closes(), regime_len, slope_window);
    Ok(Signal::from_weights(series, to_weights(&mask)))
}

pub fn regime_filter_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [100, 150, 200] {
        for slope_window in [0, 10, 20, 50] {
            grid.push(
                Params::new()
                    .with("regime_len", regime_len)
                    .with("slope_window", slope_window),
            );
        }
    }
    grid
}

// ============================================================================
// C: buy the dip inside an uptrend
// ============================================================================

/// Enter when in regime and close is within `dip_pct`% above `EMA(dip_ema)`;
/// hold until close drops under `EMA(regime_len)`.
pub fn buy_dip_in_uptrend(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let dip_ema = params.get_span("dip_ema")?;
    let dip_pct = params.get_f64("dip_pct")?;

    let close = series.closes();
    let (in_regime, _) = regime_mask(&close, regime_len, 0);
    let near_dip = within_pct_above(&close, &ema(&close, dip_ema), dip_pct);
    let entry = and(&in_regime, &near_dip);

    Ok(Signal::from_weights(series, enter_and_hold(&entry, &in_regime)))
}

pub fn buy_dip_in_uptrend_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [150, 200] {
        for dip_ema in [20, 50] {
            for dip_pct in [0.0, 1.0, 2.0, 3.0] {
                grid.push(
                    Params::new()
                        .with("regime_len", regime_len)
                        .with("dip_ema", dip_ema)
                        .with("dip_pct", dip_pct),
                );
            }
        }
    }
    grid
}

// ============================================================================
// D: EMA crossover + ATR trailing stop
// ============================================================================

/// Enter on `EMA(fast) > EMA(slow)`; exit on the ATR trailing stop or when the
/// crossover turns bearish. Re-entry needs the crossover again.
pub fn ema_atr_stop(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let fast = params.get_span("fast")?;
    let slow = params.get_span("slow")?;
    let atr_len = params.get_span("atr_len")?;
    let atr_mult = params.get_f64("atr_mult")?;

    let close = series.closes();
    let bullish = gt(&ema(&close, fast), &ema(&close, slow));
    let atr_values = atr(&series.highs(), &series.lows(), &close, atr_len);

    let w = trailing_stop(&close, &atr_values, atr_mult, &bullish, &bullish);
    Ok(Signal::from_weights(series, w))
}

pub fn ema_atr_stop_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for fast in [10, 20, 50] {
        for slow in [100, 150, 200] {
            if fast >= slow {
                continue;
            }
            for atr_len in [14, 20] {
                for atr_mult in [2.0, 3.0, 4.0] {
                    grid.push(
                        Params::new()
                            .with("fast", fast)
                            .with("slow", slow)
                            .with("atr_len", atr_len)
                            .with("atr_mult", atr_mult),
                    );
                }
            }
        }
    }
    grid
}

// ============================================================================
// E: composite (regime + dip entry + ATR stop)
// ============================================================================

pub fn composite(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let slope_window = params.get_usize("slope_window")?;
    let entry_ema = params.get_span("entry_ema")?;
    let entry_band_pct = params.get_f64("entry_band_pct")?;
    let atr_len = params.get_span("atr_len")?;
    let atr_mult = params.get_f64("atr_mult")?;

    let close = series.closes();
    let (in_regime, _) = regime_mask(&close, regime_len, slope_window);
    let near_entry = within_pct_above(&close, &ema(&close, entry_ema), entry_band_pct);
    let entry = and(&in_regime, &near_entry);
    let atr_values = atr(&series.highs(), &series.lows(), &close, atr_len);

    let w = trailing_stop(&close, &atr_values, atr_mult, &entry, &in_regime);
    Ok(Signal::from_weights(series, w))
}

pub fn composite_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [150, 200] {
        for slope_window in [0, 20] {
            for entry_ema in [20, 50] {
                for entry_band_pct in [1.0, 3.0, 5.0] {
                    for atr_len in [14, 20] {
                        for atr_mult in [2.5, 3.5, 5.0] {
                            grid.push(
                                Params::new()
                                    .with("regime_len", regime_len)
                                    .with("slope_window", slope_window)
                                    .with("entry_ema", entry_ema)
                                    .with("entry_band_pct", entry_band_pct)
                                    .with("atr_len", atr_len)
                                    .with("atr_mult", atr_mult),
                            );
                        }
                    }
                }
            }
        }
    }
    grid
}

// ============================================================================
// F: hysteresis regime
// ============================================================================

/// Enter above `EMA * (1 + upper_pct/100)` (with optional slope filter on
/// entry only), exit below `EMA * (1 - lower_pct/100)`.
pub fn hysteresis_regime(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let upper_pct = params.get_f64("upper_pct")?;
    let lower_pct = params.get_f64("lower_pct")?;
    let slope_window = params.get_usize("slope_window")?;

    let close = series.closes();
    let e = ema(&close, regime_len);
    let upper: Vec<f64> = e.iter().map(|v| v * (1.0 + upper_pct / 100.0)).collect();
    let lower: Vec<f64> = e.iter().map(|v| v * (1.0 - lower_pct / 100.0)).collect();
    let slope_ok = slope_positive(&e, slope_window).unwrap_or_else(|| vec![true; close.len()]);

    Ok(Signal::from_weights(
        series,
        hysteresis(&close, &upper, &lower, &slope_ok),
    ))
}

pub fn hysteresis_regime_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [100, 150, 200] {
        for upper_pct in [0.0, 1.0, 2.0] {
            for lower_pct in [1.0, 2.0, 3.0] {
                for slope_window in [0, 20] {
                    grid.push(
                        Params::new()
                            .with("regime_len", regime_len)
                            .with("upper_pct", upper_pct)
                            .with("lower_pct", lower_pct)
                            .with("slope_window", slope_window),
                    );
                }
            }
        }
    }
    grid
}

// ============================================================================
// G: volatility-scaled regime sizing
// ============================================================================

/// In regime, weight = `clamp(target_vol / realized_vol, 0, 1)`.
///
/// Realized vol of zero is treated as missing; missing values carry the
/// last known vol forward, and leading gaps use `target_vol` (weight 1.0).
pub fn sizing_regime(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let slope_window = params.get_usize("slope_window")?;
    let vol_window = params.get_span("vol_window")?;
    let target_vol = params.get_f64("target_vol")?;

    let close = series.closes();
    let (in_regime, _) = regime_mask(&close, regime_len, slope_window);

    let mut last: Option<f64> = None;
    let weights = realized_vol(&close, vol_window)
        .into_iter()
        .zip(&in_regime)
        .map(|(v, &regime)| {
            if !v.is_nan() && v != 0.0 {
                last = Some(v);
            }
            let vol = last.unwrap_or(target_vol);
            if regime {
                (target_vol / vol).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect();

    Ok(Signal::from_weights(series, weights))
}

pub fn sizing_regime_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [100, 150, 200] {
        for slope_window in [0, 20] {
            for vol_window in [20, 40, 60] {
                for target_vol in [0.10, 0.15, 0.20] {
                    grid.push(
                        Params::new()
                            .with("regime_len", regime_len)
                            .with("slope_window", slope_window)
                            .with("vol_window", vol_window)
                            .with("target_vol", target_vol),
                    );
                }
            }
        }
    }
    grid
}

// ============================================================================
// H: ATR dip add-on
// ============================================================================

/// `base_weight` in regime; add `addon_weight` (capped at 1.0) once close
/// dips `dip_atr_mult` ATRs under `EMA(dip_ema)`, until it recovers above it.
pub fn atr_dip_addon(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let dip_ema = params.get_span("dip_ema")?;
    let atr_len = params.get_span("atr_len")?;
    let dip_atr_mult = params.get_f64("dip_atr_mult")?;
    let base_weight = params.get_f64("base_weight")?;
    let addon_weight = params.get_f64("addon_weight")?;

    let close = series.closes();
    let (in_regime, _) = regime_mask(&close, regime_len, 0);
    let ema_dip = ema(&close, dip_ema);
    let atr_values = atr(&series.highs(), &series.lows(), &close, atr_len);
    let in_dip: Vec<bool> = close
        .iter()
        .zip(ema_dip.iter().zip(&atr_values))
        .map(|(c, (e, a))| *c <= e - dip_atr_mult * a)
        .collect();

    Ok(Signal::from_weights(
        series,
        dip_addon(&close, &ema_dip, &in_regime, &in_dip, base_weight, addon_weight),
    ))
}

pub fn atr_dip_addon_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [150, 200] {
        for dip_ema in [20, 50] {
            for atr_len in [14, 20] {
                for dip_atr_mult in [1.0, 1.5, 2.0] {
                    for base_weight in [0.5, 0.7] {
                        for addon_weight in [0.3, 0.5] {
                            grid.push(
                                Params::new()
                                    .with("regime_len", regime_len)
                                    .with("dip_ema", dip_ema)
                                    .with("atr_len", atr_len)
                                    .with("dip_atr_mult", dip_atr_mult)
                                    .with("base_weight", base_weight)
                                    .with("addon_weight", addon_weight),
                            );
                        }
                    }
                }
            }
        }
    }
    grid
}

// ============================================================================
// I: breakout or dip
// ============================================================================

/// In regime, enter on a new `breakout_len`-bar high (close >= rolling max
/// high) or on a pullback near `EMA(dip_ema)`. Exit on ATR trailing stop or
/// regime break.
pub fn breakout_or_dip(series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
    let regime_len = params.get_span("regime_len")?;
    let breakout_len = params.get_span("breakout_len")?;
    let dip_ema = params.get_span("dip_ema")?;
    let dip_pct = params.get_f64("dip_pct")?;
    let atr_len = params.get_span("atr_len")?;
    let atr_mult = params.get_f64("atr_mult")?;

    let close = series.closes();
    let high = series.highs();
    let (in_regime, _) = regime_mask(&close, regime_len, 0);

    let highest = rolling_max(&high, breakout_len);
    let breakout: Vec<bool> = close.iter().zip(&highest).map(|(c, h)| c >= h).collect();
    let dip = within_pct_above(&close, &ema(&close, dip_ema), dip_pct);
    let entry = and(&in_regime, &or(&breakout, &dip));
    let atr_values = atr(&high, &series.lows(), &close, atr_len);

    let w = trailing_stop(&close, &atr_values, atr_mult, &entry, &in_regime);
    Ok(Signal::from_weights(series, w))
}

pub fn breakout_or_dip_grid() -> Vec<Params> {
    let mut grid = Vec::new();
    for regime_len in [150, 200] {
        for breakout_len in [20, 50] {
            for dip_ema in [20, 50] {
                for dip_pct in [1.0, 3.0] {
                    for atr_len in [14, 20] {
                        for atr_mult in [3.0, 4.0, 5.0] {
                            grid.push(
                                Params::new()
                                    .with("regime_len", regime_len)
                                    .with("breakout_len", breakout_len)
                                    .with("dip_ema", dip_ema)
                                    .with("dip_pct", dip_pct)
                                    .with("atr_len", atr_len)
                                    .with("atr_mult", atr_mult),
                            );
                        }
                    }
                }
            }
        }
    }
    grid
}

// ============================================================================
// Registry
// ============================================================================

/// Register A-I in catalog order.
pub fn register_catalog(reg: &mut StrategyRegistry) -> Result<(), StrategyError> {
    reg.register(
        StrategyMeta::new("A_ema_crossover", "EMA fast/slow crossover"),
        ema_crossover,
        ema_crossover_grid,
    )?;
    reg.register(
        StrategyMeta::new("B_regime_filter", "Regime filter (price > EMA + slope)"),
        regime_filter,
        regime_filter_grid,
    )?;
    reg.register(
        StrategyMeta::new("C_buy_dip_uptrend", "Buy-the-dip inside bullish regime"),
        buy_dip_in_uptrend,
        buy_dip_in_uptrend_grid,
    )?;
    reg.register(
        StrategyMeta::new("D_ema_atr_stop", "EMA crossover + ATR trailing stop"),
        ema_atr_stop,
        ema_atr_stop_grid,
    )?;
    reg.register(
        StrategyMeta::new("E_composite", "Composite: regime + dip entry + ATR stop"),
        composite,
        composite_grid,
    )?;
    reg.register(
        StrategyMeta::new(
            "F_hysteresis_regime",
            "Regime filter with hysteresis bands (anti-whipsaw)",
        ),
        hysteresis_regime,
        hysteresis_regime_grid,
    )?;
    reg.register(
        StrategyMeta::new("G_sizing_regime", "Vol-scaled regime sizing (fractional 0..1)"),
        sizing_regime,
        sizing_regime_grid,
    )?;
    reg.register(
        StrategyMeta::new("H_atr_dip_addon", "Regime + ATR dip add-on (fractional 0..1)"),
        atr_dip_addon,
        atr_dip_addon_grid,
    )?;
    reg.register(
        StrategyMeta::new("I_breakout_or_dip", "Dual-mode: breakout OR dip entry + ATR stop"),
        breakout_or_dip,
        breakout_or_dip_grid,
    )?;
    Ok(())
}
