//! Strategy registry: catalogue of available signal functions + metadata.
//!
//! Each entry pairs [`StrategyMeta`] with a [`SignalFn`] and a [`GridFn`]
//! producing the strategy's base parameter grid. Insertion order is kept so
//! `list()` and every sweep over the registry are deterministic.

use crate::{catalog, Params, SignalFn, StrategyError};

/// Produces a strategy's base parameter grid (without risk scaling).
pub type GridFn = fn() -> Vec<Params>;

/// Static metadata for a registered strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyMeta {
    /// Unique registry key.
    pub name: String,
    pub description: String,
}

impl StrategyMeta {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One registered strategy. Fields are plain function pointers, so entries
/// are cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct StrategyEntry {
    pub meta: StrategyMeta,
    pub signal: SignalFn,
    pub grid: GridFn,
}

/// Catalogue of available strategies, in insertion order.
/// Names are compared case-sensitively.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<StrategyEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The built-in A-I catalog.
    pub fn catalog() -> Self {
        let mut reg = Self::new();
        let registered = catalog::register_catalog(&mut reg);
        debug_assert!(registered.is_ok(), "catalog names are unique literals");
        reg
    }

    /// # Errors
    /// - [`StrategyError::EmptyName`] if `meta.name` is empty/whitespace.
    /// - [`StrategyError::DuplicateName`] if the name is already registered.
    pub fn register(
        &mut self,
        meta: StrategyMeta,
        signal: SignalFn,
        grid: GridFn,
    ) -> Result<(), StrategyError> {
        if meta.name.trim().is_empty() {
            return Err(StrategyError::EmptyName);
        }
        if self.contains(&meta.name) {
            return Err(StrategyError::DuplicateName {
                name: meta.name.clone(),
            });
        }
        self.entries.push(StrategyEntry { meta, signal, grid });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.meta.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata for all registered strategies in insertion order.
    pub fn list(&self) -> Vec<&StrategyMeta> {
        self.entries.iter().map(|e| &e.meta).collect()
    }

    pub fn entries(&self) -> &[StrategyEntry] {
        &self.entries
    }

    /// # Errors
    /// [`StrategyError::UnknownStrategy`] if the name is not found.
    pub fn get(&self, name: &str) -> Result<&StrategyEntry, StrategyError> {
        self.entries
            .iter()
            .find(|e| e.meta.name == name)
            .ok_or_else(|| StrategyError::UnknownStrategy {
                name: name.to_string(),
            })
    }
}
