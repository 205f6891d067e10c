//! A fold whose validation window would end on the holdout start date is
//! dropped: validation never touches the first holdout bar.
//!
//! Success criteria:
//! - `val_end == holdout_start` excludes the fold
//! - one day later the same fold is kept
//! - every kept fold ends strictly before the holdout start
use ddc_testkit::{business_days_between, series_from_closes, ymd};
use ddc_walkforward::{build_folds, FoldWindows};

fn one_year_windows() -> FoldWindows {
    FoldWindows {
        train_years: 1,
        val_years: 1,
        step_years: 1,
    }
}

fn series() -> ddc_backtest::PriceSeries {
    let dates = business_days_between(ymd(2000, 1, 3), ymd(2006, 12, 29));
    let closes: Vec<f64> = (0..dates.len()).map(|i| 50.0 + i as f64 * 0.02).collect();
    series_from_closes(&dates, &closes)
}

#[test]
fn fold_ending_on_holdout_start_is_excluded() {
    // first fold: train 2000-01-03..2001-01-03, val ..2002-01-03
    let folds = build_folds(&series(), &one_year_windows(), ymd(2002, 1, 3)).unwrap();
    assert!(folds.is_empty());
}

#[test]
fn fold_ending_one_day_before_holdout_is_kept() {
    let folds = build_folds(&series(), &one_year_windows(), ymd(2002, 1, 4)).unwrap();
    assert_eq!(folds.len(), 1);
    assert_eq!(folds[0].val_end, ymd(2002, 1, 3));
}

#[test]
fn kept_folds_stay_before_holdout() {
    let holdout = ymd(2006, 1, 1);
    let folds = build_folds(&series(), &one_year_windows(), holdout).unwrap();
    assert_eq!(folds.len(), 4);
    for f in &folds {
        assert!(f.val_end < holdout);
        assert_eq!(f.train_end, f.val_start);
    }
}
