//! `ddc select` end to end on a synthetic uptrend.
//!
//! Success criteria:
//! - with reachable constraints a winner is printed and the report names it
//! - with unreachable constraints the command fails with "no viable strategy"
//!   and still writes the report with a null winner
//! - a holdout start past the data still writes the report, with a null holdout
//! - an invalid --risk-scales override is rejected before any evaluation
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

use ddc_testkit::{business_days, ymd};

#[allow(deprecated)]
fn ddc() -> Command {
    Command::cargo_bin("ddc").unwrap()
}

const CONFIG: &str = r#"
walk_forward:
  train_years: 1
  val_years: 1
  step_years: 1
  holdout_start: "2008-01-01"
strategies: [B_regime_filter]
risk_scales: [1.0]
"#;

fn write_trend_csv(path: &Path) {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    let mut px = 100.0_f64;
    for d in business_days(ymd(2000, 1, 3), 252 * 9) {
        out.push_str(&format!(
            "{d},{:.6},{:.6},{:.6},{:.6},1000000\n",
            px,
            px * 1.005,
            px * 0.995,
            px
        ));
        px *= 1.0004;
    }
    std::fs::write(path, out).unwrap();
}

fn read_report(dir: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("selection_report.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn uptrend_selects_a_winner() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    let cfg = dir.path().join("ddcap.yaml");
    let out = dir.path().join("out");
    write_trend_csv(&csv);
    std::fs::write(&cfg, CONFIG).unwrap();

    ddc()
        .args([
            "select",
            "--data",
            csv.to_str().unwrap(),
            "--config",
            cfg.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("folds=6"))
        .stdout(predicate::str::contains("winner=B_regime_filter"))
        .stdout(predicate::str::contains("holdout_buy_and_hold_cagr="));

    let report = read_report(&out);
    assert_eq!(report["winner"]["strategy"], "B_regime_filter");
    assert_eq!(report["strategies"][0]["expanded_grid_size"], 12);
    assert!(report["config_hash"].as_str().is_some_and(|h| h.len() == 64));
    assert!(report["holdout"]["rows"].as_u64().is_some_and(|r| r > 100));
}

#[test]
fn unreachable_constraints_exit_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    let cfg = dir.path().join("ddcap.yaml");
    let strict = dir.path().join("strict.yaml");
    let out = dir.path().join("out");
    write_trend_csv(&csv);
    std::fs::write(&cfg, CONFIG).unwrap();
    std::fs::write(&strict, "constraints:\n  min_exposure: 100.0\n").unwrap();

    ddc()
        .args([
            "select",
            "--data",
            csv.to_str().unwrap(),
            "--config",
            cfg.to_str().unwrap(),
            "--config",
            strict.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no viable strategy"));

    let report = read_report(&out);
    assert!(report["winner"].is_null());
    assert!(report["holdout"].is_null());
    assert_eq!(report["strategies"][0]["n_passed"], 0);
}

#[test]
fn holdout_past_last_bar_keeps_research_result() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    let cfg = dir.path().join("ddcap.yaml");
    let late = dir.path().join("late.yaml");
    let out = dir.path().join("out");
    write_trend_csv(&csv);
    std::fs::write(&cfg, CONFIG).unwrap();
    std::fs::write(&late, "walk_forward:\n  holdout_start: \"2010-01-01\"\n").unwrap();

    ddc()
        .args([
            "select",
            "--data",
            csv.to_str().unwrap(),
            "--config",
            cfg.to_str().unwrap(),
            "--config",
            late.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("winner=B_regime_filter"))
        .stdout(predicate::str::contains("holdout=unavailable"));

    let report = read_report(&out);
    assert_eq!(report["winner"]["strategy"], "B_regime_filter");
    assert!(report["holdout"].is_null());
    assert_eq!(report["holdout_start"], "2010-01-01");
}

#[test]
fn invalid_risk_scale_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spy.csv");
    let out = dir.path().join("out");
    write_trend_csv(&csv);

    ddc()
        .args([
            "select",
            "--data",
            csv.to_str().unwrap(),
            "--risk-scales",
            "0.5,1.5",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid select options"));
    assert!(!out.join("selection_report.json").exists());
}
