//! `ddc backtest` over a CSV on disk.
//!
//! Success criteria:
//! - parameter overrides and the risk scale are echoed back
//! - strategy and buy-and-hold metrics are both printed
//! - an unknown strategy or an out-of-range risk scale fails
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

use ddc_testkit::{business_days, ymd};

#[allow(deprecated)]
fn ddc() -> Command {
    Command::cargo_bin("ddc").unwrap()
}

fn write_trend_csv(path: &Path, n: usize) {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    let mut px = 100.0_f64;
    for d in business_days(ymd(2015, 1, 5), n) {
        out.push_str(&format!(
            "{d},{:.4},{:.4},{:.4},{:.4},1000000\n",
            px,
            px * 1.005,
            px * 0.995,
            px
        ));
        px *= 1.0005;
    }
    std::fs::write(path, out).unwrap();
}

#[test]
fn prints_strategy_and_buy_and_hold() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    write_trend_csv(&csv, 600);

    ddc()
        .args([
            "backtest",
            "--data",
            csv.to_str().unwrap(),
            "--strategy",
            "B_regime_filter",
            "--param",
            "regime_len=50",
            "--risk-scale",
            "0.5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("backtest_ok=true"))
        .stdout(predicate::str::contains("strategy=B_regime_filter"))
        .stdout(predicate::str::contains("regime_len=50"))
        .stdout(predicate::str::contains("risk_scale=0.5"))
        .stdout(predicate::str::contains("rows=600"))
        .stdout(predicate::str::contains("buy_and_hold_cagr="));
}

#[test]
fn unknown_strategy_fails() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    write_trend_csv(&csv, 100);

    ddc()
        .args([
            "backtest",
            "--data",
            csv.to_str().unwrap(),
            "--strategy",
            "Z_missing",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Z_missing"));
}

#[test]
fn risk_scale_above_one_fails() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    write_trend_csv(&csv, 100);

    ddc()
        .args([
            "backtest",
            "--data",
            csv.to_str().unwrap(),
            "--strategy",
            "B_regime_filter",
            "--risk-scale",
            "1.5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("risk-scale"));
}
