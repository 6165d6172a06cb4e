// In crates/commission/src/registry.rs

use std::collections::HashMap;
use std::fmt;

use core_types::Symbol;

use crate::scheme::CommissionScheme;

/// Key of a registry entry: either the default scheme or a specific instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommissionKey {
    Default,
    Instrument(Symbol),
}

impl From<Option<Symbol>> for CommissionKey {
    fn from(name: Option<Symbol>) -> Self {
        match name {
            Some(symbol) => CommissionKey::Instrument(symbol),
            None => CommissionKey::Default,
        }
    }
}

impl From<Symbol> for CommissionKey {
    fn from(symbol: Symbol) -> Self {
        CommissionKey::Instrument(symbol)
    }
}

impl fmt::Display for CommissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommissionKey::Default => f.write_str("<default>"),
            CommissionKey::Instrument(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// Commission schemes keyed by instrument, with a default entry for everything else.
///
/// Entries are only ever added or replaced.
#[derive(Debug, Clone, Default)]
pub struct CommissionRegistry {
    entries: HashMap<CommissionKey, CommissionScheme>,
}

impl CommissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `scheme` as the default entry unless one is already present.
    ///
    /// Returns `true` if the entry was installed.
    pub fn ensure_default(&mut self, scheme: &CommissionScheme) -> bool {
        if self.entries.contains_key(&CommissionKey::Default) {
            return false;
        }
        self.entries.insert(CommissionKey::Default, scheme.clone());
        true
    }

    /// Registers `scheme` under `key`, returning the entry it replaced.
    pub fn register(&mut self, key: CommissionKey, scheme: CommissionScheme) -> Option<CommissionScheme> {
        let previous = self.entries.insert(key.clone(), scheme);
        if previous.is_some() {
            tracing::debug!(%key, "Replaced commission scheme.");
        } else {
            tracing::debug!(%key, "Registered commission scheme.");
        }
        previous
    }

    pub fn get(&self, key: &CommissionKey) -> Option<&CommissionScheme> {
        self.entries.get(key)
    }

    pub fn default_scheme(&self) -> Option<&CommissionScheme> {
        self.entries.get(&CommissionKey::Default)
    }

    /// The scheme registered for `symbol`, falling back to the default entry.
    pub fn resolve(&self, symbol: &Symbol) -> Option<&CommissionScheme> {
        self.entries
            .get(&CommissionKey::Instrument(symbol.clone()))
            .or_else(|| self.default_scheme())
    }

    /// Instruments that have a scheme of their own.
    pub fn instruments(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.keys().filter_map(|key| match key {
            CommissionKey::Instrument(symbol) => Some(symbol),
            CommissionKey::Default => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
