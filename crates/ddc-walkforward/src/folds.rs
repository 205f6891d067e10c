use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use ddc_backtest::PriceSeries;

use crate::WalkForwardError;

/// One rolling (train, validation) date-range pair. `train_end == val_start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub val_start: NaiveDate,
    pub val_end: NaiveDate,
}

/// Window lengths in calendar years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldWindows {
    pub train_years: u32,
    pub val_years: u32,
    pub step_years: u32,
}

impl Default for FoldWindows {
    fn default() -> Self {
        Self {
            train_years: 8,
            val_years: 2,
            step_years: 2,
        }
    }
}

impl FoldWindows {
    pub fn validate(&self) -> Result<(), WalkForwardError> {
        for (name, value) in [
            ("train_years", self.train_years),
            ("val_years", self.val_years),
            ("step_years", self.step_years),
        ] {
            if value == 0 {
                return Err(WalkForwardError::InvalidWindow { name, value });
            }
        }
        Ok(())
    }
}

/// Calendar-year offset. Feb 29 lands on Feb 28 in non-leap years.
/// `None` only on date overflow.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Rolling folds from the series' first date, stepping `step_years` each time.
///
/// A fold is kept only while `val_end` is strictly before `holdout_start`,
/// so no validation window includes the first holdout date. Folds overlap
/// whenever `step_years < train_years + val_years`.
pub fn build_folds(
    series: &PriceSeries,
    windows: &FoldWindows,
    holdout_start: NaiveDate,
) -> Result<Vec<Fold>, WalkForwardError> {
    windows.validate()?;
    Ok(fold_range(series.first_date(), windows, holdout_start))
}

pub(crate) fn fold_range(
    start: NaiveDate,
    windows: &FoldWindows,
    holdout_start: NaiveDate,
) -> Vec<Fold> {
    let mut folds = Vec::new();
    let mut fold_start = start;
    loop {
        let Some(train_end) = add_years(fold_start, windows.train_years) else {
            break;
        };
        let Some(val_end) = add_years(train_end, windows.val_years) else {
            break;
        };
        if val_end >= holdout_start {
            break;
        }
        folds.push(Fold {
            train_start: fold_start,
            train_end,
            val_start: train_end,
            val_end,
        });
        match add_years(fold_start, windows.step_years) {
            Some(next) => fold_start = next,
            None => break,
        }
    }
    folds
}
