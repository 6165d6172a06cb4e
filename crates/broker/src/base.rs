// In crates/broker/src/base.rs

use commission::{CommissionKey, CommissionParams, CommissionRegistry, CommissionScheme};
use core_types::Symbol;

use crate::Result;

/// State every broker backend shares: the commission registry and its configured
/// default scheme.
///
/// Backends embed one `BrokerCore` and hand it out through [`crate::Broker::core`],
/// so commission resolution behaves identically whatever executes the orders.
#[derive(Debug, Clone)]
pub struct BrokerCore {
    default_commission: CommissionScheme,
    registry: CommissionRegistry,
    started: bool,
}

impl BrokerCore {
    pub fn new(default_commission: CommissionScheme) -> Self {
        let mut core = Self {
            default_commission,
            registry: CommissionRegistry::new(),
            started: false,
        };
        core.init();
        core
    }

    /// Guarantees the default registry entry exists.
    ///
    /// Safe to call any number of times; an existing default entry (including one
    /// replaced through `set_commission(.., None)`) and instrument entries are kept.
    pub fn init(&mut self) {
        if self.registry.ensure_default(&self.default_commission) {
            tracing::debug!("Installed default commission scheme.");
        }
    }

    pub fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The scheme for `symbol`, or the default scheme when none is registered.
    pub fn resolve_commission(&self, symbol: &Symbol) -> &CommissionScheme {
        self.registry.resolve(symbol).unwrap_or(&self.default_commission)
    }

    /// Builds a scheme from `params` and registers it under `name`, or as the
    /// default when `name` is `None`.
    pub fn set_commission(&mut self, params: CommissionParams, name: Option<Symbol>) -> Result<()> {
        let scheme = CommissionScheme::new(params)?;
        self.add_commission_info(scheme, name);
        Ok(())
    }

    pub fn add_commission_info(&mut self, scheme: CommissionScheme, name: Option<Symbol>) {
        self.registry.register(CommissionKey::from(name), scheme);
    }

    pub fn registry(&self) -> &CommissionRegistry {
        &self.registry
    }
}

impl Default for BrokerCore {
    fn default() -> Self {
        Self::new(CommissionScheme::default())
    }
}
