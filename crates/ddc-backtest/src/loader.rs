//! Daily OHLCV CSV loader (deterministic).
//!
//! CSV format
//!
//! - First column (or a column named `date`): the bar date. Anything after
//!   the first 10 characters (`YYYY-MM-DD`) is ignored, so exported
//!   timestamps like `2020-01-02 00:00:00-05:00` load as plain dates.
//! - Price columns are matched case-insensitively by substring:
//!   `open`, `high`, `low`, `close`, `vol`. The first header matching each
//!   role wins, except an exact name match is preferred (so `Close` beats
//!   `Adj Close` when both are present).
//!
//! Rows with an empty or non-numeric close are dropped. Output is sorted by
//! date; duplicate dates keep the first row seen.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::types::{DataError, PriceBar, PriceSeries};

/// Loader errors are small, explicit, and test-friendly.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    EmptyInput,
    MissingColumn(&'static str),
    ParseDate { line: usize, value: String },
    ParseFloat {
        line: usize,
        column: &'static str,
        value: String,
    },
    Csv(String),
    Io(String),
    Data(DataError),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        LoadError::Csv(e.to_string())
    }
}

impl From<DataError> for LoadError {
    fn from(e: DataError) -> Self {
        LoadError::Data(e)
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::EmptyInput => write!(f, "empty input"),
            LoadError::MissingColumn(c) => write!(f, "missing column: {}", c),
            LoadError::ParseDate { line, value } => {
                write!(f, "failed to parse date at line {}: {}", line, value)
            }
            LoadError::ParseFloat {
                line,
                column,
                value,
            } => write!(
                f,
                "failed to parse number in column {} at line {}: {}",
                column, line, value
            ),
            LoadError::Csv(e) => write!(f, "csv error: {}", e),
            LoadError::Io(e) => write!(f, "io error: {}", e),
            LoadError::Data(e) => write!(f, "invalid series: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

/// Load a price series from a CSV file on disk.
pub fn load_price_csv(path: impl AsRef<Path>) -> Result<PriceSeries, LoadError> {
    let s = fs::read_to_string(path)?;
    parse_price_csv(&s)
}

/// Parse a price series from CSV content (pure, deterministic).
pub fn parse_price_csv(content: &str) -> Result<PriceSeries, LoadError> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let cols = ColumnMap::resolve(&headers)?;

    let mut bars: Vec<PriceBar> = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        // 1-based, counting header as line 1.
        let line = rec.position().map(|p| p.line() as usize).unwrap_or(i + 2);

        let field = |col: usize| rec.get(col).unwrap_or("");

        let close = match parse_close(field(cols.close)) {
            Some(c) => c,
            None => continue,
        };
        let date = parse_date(field(cols.date), line)?;
        let open = parse_optional_f64(field(cols.open), line, "open")?.unwrap_or(f64::NAN);
        let high = parse_optional_f64(field(cols.high), line, "high")?.unwrap_or(f64::NAN);
        let low = parse_optional_f64(field(cols.low), line, "low")?.unwrap_or(f64::NAN);
        let volume = parse_optional_f64(field(cols.volume), line, "volume")?.unwrap_or(f64::NAN);

        bars.push(PriceBar::new(date, open, high, low, close, volume));
    }

    if bars.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    // Stable sort, then keep the first row per date.
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);

    Ok(PriceSeries::new(bars)?)
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, LoadError> {
        if headers.is_empty() {
            return Err(LoadError::EmptyInput);
        }
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let date = lowered
            .iter()
            .position(|h| h == "date" || h == "datetime" || h == "timestamp")
            .unwrap_or(0);

        let find = |exact: &str, needle: &str, role: &'static str| -> Result<usize, LoadError> {
            lowered
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != date)
                .find(|(_, h)| h.as_str() == exact)
                .or_else(|| {
                    lowered
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != date)
                        .find(|(_, h)| h.contains(needle))
                })
                .map(|(i, _)| i)
                .ok_or(LoadError::MissingColumn(role))
        };

        Ok(Self {
            date,
            open: find("open", "open", "open")?,
            high: find("high", "high", "high")?,
            low: find("low", "low", "low")?,
            close: find("close", "close", "close")?,
            volume: find("volume", "vol", "volume")?,
        })
    }
}

fn parse_date(s: &str, line: usize) -> Result<NaiveDate, LoadError> {
    let t = s.trim();
    let head = t.get(..10).unwrap_or(t);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| LoadError::ParseDate {
        line,
        value: t.to_string(),
    })
}

/// Close drives row selection: anything that is not a number drops the row.
fn parse_close(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Empty, `NaN` and `null` read as missing.
fn parse_optional_f64(
    s: &str,
    line: usize,
    column: &'static str,
) -> Result<Option<f64>, LoadError> {
    let t = s.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let v = t.parse::<f64>().map_err(|_| LoadError::ParseFloat {
        line,
        column,
        value: t.to_string(),
    })?;
    if v.is_nan() {
        Ok(None)
    } else {
        Ok(Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sorts_and_keeps_first_duplicate() {
        let csv = "Date,Open,High,Low,Close,Volume
2020-01-03,3,3,3,3,30
2020-01-02,2,2,2,2,20
2020-01-03,9,9,9,9,90
";
        let s = parse_price_csv(csv).expect("parse");
        assert_eq!(s.len(), 2);
        assert_eq!(s.closes(), vec![2.0, 3.0]);
    }

    #[test]
    fn non_numeric_close_drops_row_other_columns_fail() {
        let csv = "Date,Open,High,Low,Close,Volume
2020-01-02,2,2,2,2,20
2020-01-03,3,3,3,--,30
2020-01-06,4,4,4,n/a,40
2020-01-07,5,5,5,,50
2020-01-08,6,6,6,6,60
";
        let s = parse_price_csv(csv).expect("parse");
        assert_eq!(s.closes(), vec![2.0, 6.0]);

        let bad_open = "Date,Open,High,Low,Close,Volume
2020-01-02,abc,2,2,2,20
";
        assert!(matches!(
            parse_price_csv(bad_open),
            Err(LoadError::ParseFloat { column: "open", .. })
        ));
    }

    #[test]
    fn columns_match_by_substring_case_insensitive() {
        let csv = "timestamp,OPEN_px,high price,LowPx,close,total_vol
2021-06-01 00:00:00-04:00,1,2,0.5,1.5,100
";
        let s = parse_price_csv(csv).expect("parse");
        let b = s.bars()[0];
        assert_eq!(b.date, NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
        assert_eq!((b.open, b.high, b.low, b.close, b.volume), (1.0, 2.0, 0.5, 1.5, 100.0));
    }

    #[test]
    fn exact_close_beats_adj_close() {
        let csv = "Date,Open,High,Low,Adj Close,Close,Volume
2020-01-02,1,1,1,7,5,1
";
        let s = parse_price_csv(csv).expect("parse");
        assert_eq!(s.closes(), vec![5.0]);
    }

    #[test]
    fn rows_without_close_are_dropped() {
        let csv = "Date,Open,High,Low,Close,Volume
2020-01-02,1,1,1,,1
2020-01-03,1,1,1,NaN,1
2020-01-06,1,1,1,4,1
";
        let s = parse_price_csv(csv).expect("parse");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "Date,Open,High,Low,Volume
2020-01-02,1,1,1,1
";
        assert_eq!(parse_price_csv(csv), Err(LoadError::MissingColumn("close")));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_price_csv(""), Err(LoadError::EmptyInput));
        assert_eq!(
            parse_price_csv("Date,Open,High,Low,Close,Volume\n"),
            Err(LoadError::EmptyInput)
        );
    }

    #[test]
    fn bad_date_is_reported_with_line() {
        let csv = "Date,Open,High,Low,Close,Volume
01/02/2020,1,1,1,1,1
";
        assert!(matches!(
            parse_price_csv(csv),
            Err(LoadError::ParseDate { line: 2, .. })
        ));
    }
}
