use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::StrategyError;

/// A single strategy parameter. Window lengths are `Int`, thresholds `Float`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    /// Parse `"20"` as `Int`, anything else numeric as `Float`.
    pub fn parse(s: &str) -> Option<ParamValue> {
        let t = s.trim();
        if let Ok(i) = t.parse::<i64>() {
            return Some(ParamValue::Int(i));
        }
        t.parse::<f64>().ok().map(ParamValue::Float)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Int(i) => i as f64,
            ParamValue::Float(f) => f,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// Ordered parameter set handed to a strategy. Key order is stable so two
/// equal sets always print the same way.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder form of [`Params::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Copy without `key`; `self` is left untouched.
    pub fn without(&self, key: &str) -> Params {
        let mut out = self.clone();
        out.0.remove(key);
        out
    }

    fn require(&self, key: &str) -> Result<ParamValue, StrategyError> {
        self.get(key).ok_or_else(|| StrategyError::MissingParam {
            name: key.to_string(),
        })
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, StrategyError> {
        let v = self.require(key)?.as_f64();
        if v.is_finite() {
            Ok(v)
        } else {
            Err(StrategyError::InvalidParam {
                name: key.to_string(),
                reason: format!("must be finite, got {v}"),
            })
        }
    }

    /// A non-negative whole number. Whole-valued floats (`20.0`) are accepted.
    pub fn get_usize(&self, key: &str) -> Result<usize, StrategyError> {
        let invalid = |reason: String| StrategyError::InvalidParam {
            name: key.to_string(),
            reason,
        };
        match self.require(key)? {
            ParamValue::Int(i) if i >= 0 => Ok(i as usize),
            ParamValue::Int(i) => Err(invalid(format!("must be >= 0, got {i}"))),
            ParamValue::Float(f) if f >= 0.0 && f.fract() == 0.0 && f.is_finite() => Ok(f as usize),
            ParamValue::Float(f) => Err(invalid(format!("must be a whole number >= 0, got {f}"))),
        }
    }

    /// A window length: whole number >= 1.
    pub fn get_span(&self, key: &str) -> Result<usize, StrategyError> {
        match self.get_usize(key)? {
            0 => Err(StrategyError::InvalidParam {
                name: key.to_string(),
                reason: "must be >= 1".to_string(),
            }),
            n => Ok(n),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut p = Params::new();
        for (k, v) in iter {
            p.insert(k, v);
        }
        p
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}
