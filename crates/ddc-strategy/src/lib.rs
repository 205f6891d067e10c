//! ddc-strategy
//!
//! Strategy collaborator contract plus the built-in signal catalog.
//!
//! Contract:
//! - A strategy maps `(PriceSeries, Params)` to a `Signal` of target weights in [0, 1].
//! - Pure: weight on date t depends only on closes (and lagging indicators) up to t.
//! - Invalid params are reported as `StrategyError`, never a panic.
//! - The backtest engine applies the one-bar execution lag; strategies do not.

pub mod catalog;
mod params;
mod registry;
mod rules;

pub use params::{ParamValue, Params};
pub use registry::{GridFn, StrategyEntry, StrategyMeta, StrategyRegistry};

use ddc_backtest::{PriceSeries, Signal};

/// Parameter key stripped by the evaluator and applied after the signal.
pub const RISK_SCALE_KEY: &str = "risk_scale";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum StrategyError {
    MissingParam { name: String },
    InvalidParam { name: String, reason: String },
    UnknownStrategy { name: String },
    DuplicateName { name: String },
    EmptyName,
}

impl std::fmt::Display for StrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParam { name } => write!(f, "missing parameter '{name}'"),
            Self::InvalidParam { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            Self::UnknownStrategy { name } => {
                write!(f, "no strategy named '{name}' is registered")
            }
            Self::DuplicateName { name } => {
                write!(f, "strategy '{name}' is already registered")
            }
            Self::EmptyName => write!(f, "strategy name must not be empty"),
        }
    }
}

impl std::error::Error for StrategyError {}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Anything that turns a price series plus parameters into a weight signal.
///
/// `Send + Sync` so candidates can be evaluated across threads.
pub trait SignalStrategy: Send + Sync {
    fn signal(&self, series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError>;
}

impl<F> SignalStrategy for F
where
    F: Fn(&PriceSeries, &Params) -> Result<Signal, StrategyError> + Send + Sync,
{
    fn signal(&self, series: &PriceSeries, params: &Params) -> Result<Signal, StrategyError> {
        self(series, params)
    }
}

/// Function-pointer form stored in the registry.
pub type SignalFn = fn(&PriceSeries, &Params) -> Result<Signal, StrategyError>;
