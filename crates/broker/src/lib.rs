// In crates/broker/src/lib.rs

use commission::{CommissionParams, CommissionScheme};
use core_types::{FundRecord, HistoricalOrder, MarketSnapshot, Order, OrderParams, Position, Symbol};
use rust_decimal::Decimal;

pub mod base;
pub mod error;
pub mod fund;
pub mod simulated;
pub mod types;

// Re-export public types
pub use base::BrokerCore;
pub use error::{Error, Result};
pub use fund::{FundLedger, DEFAULT_FUND_START_VALUE};
pub use simulated::SimulatedBroker;
pub use types::SimulationSettings;

/// The universal interface for a broker backend.
///
/// A `Broker` holds the account of a simulation run: cash, positions, orders and
/// the commission schemes that apply to each instrument. Backends (a simulated
/// matching engine, a live-market adapter) only implement the execution-dependent
/// operations; commission resolution and the fund-share defaults are provided here
/// on top of the [`BrokerCore`] every backend embeds.
///
/// Operations a backend does not override fail with [`Error::NotImplemented`],
/// naming the missing capability.
pub trait Broker {
    /// The name of the backend (e.g., "SimulatedBroker").
    fn name(&self) -> &'static str;

    fn core(&self) -> &BrokerCore;

    fn core_mut(&mut self) -> &mut BrokerCore;

    /// Makes sure the default commission scheme is registered. Idempotent.
    fn init(&mut self) {
        self.core_mut().init();
    }

    /// Called once before the first simulation step.
    fn start(&mut self) -> Result<()> {
        self.init();
        self.core_mut().mark_started();
        Ok(())
    }

    /// Called once after the last simulation step.
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns the commission scheme associated with `symbol`.
    ///
    /// Falls back to the default scheme when nothing is registered for `symbol`,
    /// so the lookup never fails.
    fn commission_info(&self, symbol: &Symbol) -> &CommissionScheme {
        self.core().resolve_commission(symbol)
    }

    /// Builds a commission scheme from `params` and registers it.
    ///
    /// # Arguments
    ///
    /// * `params`: The commission, margin, multiplier, ... of the scheme.
    /// * `name`: The instrument the scheme applies to, or `None` for the default
    ///   scheme. A scheme already registered under the same key is replaced.
    fn set_commission(&mut self, params: CommissionParams, name: Option<Symbol>) -> Result<()> {
        self.core_mut().set_commission(params, name)
    }

    /// Registers a pre-built scheme, with the same replace semantics as
    /// [`Broker::set_commission`].
    fn add_commission_info(&mut self, scheme: CommissionScheme, name: Option<Symbol>) {
        self.core_mut().add_commission_info(scheme, name);
    }

    fn cash(&self) -> Result<Decimal> {
        Err(Error::not_implemented("cash"))
    }

    /// Net account value. `symbols` restricts the positions taken into account.
    fn value(&self, _symbols: Option<&[Symbol]>) -> Result<Decimal> {
        Err(Error::not_implemented("value"))
    }

    /// Number of fund shares. A backend without fund accounting has a single share.
    fn fund_shares(&self) -> Result<Decimal> {
        Ok(Decimal::ONE)
    }

    /// Value of one fund share.
    fn fund_value(&self) -> Result<Decimal> {
        self.value(None)
    }

    /// Switches fund mode on or off. `start_value` seeds the value of one share.
    ///
    /// Not every backend supports fund accounting; the default does nothing.
    fn set_fund_mode(&mut self, _enabled: bool, _start_value: Option<Decimal>) -> Result<()> {
        Ok(())
    }

    fn fund_mode(&self) -> bool {
        false
    }

    fn position(&self, _symbol: &Symbol) -> Result<Position> {
        Err(Error::not_implemented("position"))
    }

    fn submit(&mut self, _order: Order) -> Result<()> {
        Err(Error::not_implemented("submit"))
    }

    fn cancel(&mut self, _order: &Order) -> Result<()> {
        Err(Error::not_implemented("cancel"))
    }

    /// Creates and submits a buy order.
    ///
    /// # Returns
    ///
    /// The order handle as accepted by the backend.
    fn buy(&mut self, _params: OrderParams) -> Result<Order> {
        Err(Error::not_implemented("buy"))
    }

    /// Creates and submits a sell order.
    fn sell(&mut self, _params: OrderParams) -> Result<Order> {
        Err(Error::not_implemented("sell"))
    }

    /// Per-step hook, run before observers sample the broker.
    fn next(&mut self) -> Result<()> {
        Ok(())
    }

    /// Pre-seeds orders that were executed outside of this run.
    fn add_order_history(&mut self, _orders: Vec<HistoricalOrder>, _notify: bool) -> Result<()> {
        Err(Error::not_implemented("add_order_history"))
    }

    /// Pre-seeds recorded fund shares and values.
    fn set_fund_history(&mut self, _fund: Vec<FundRecord>) -> Result<()> {
        Err(Error::not_implemented("set_fund_history"))
    }
}

/// Lets a driver push the prices of the current step into a backend.
pub trait MarkToMarket {
    fn mark(&mut self, snapshot: &MarketSnapshot);
}
