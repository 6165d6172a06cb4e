// In crates/observers/src/cash.rs

use broker::Broker;

use crate::{Observer, Result, Series};

/// Samples the available cash of the broker.
#[derive(Debug, Clone)]
pub struct CashObserver {
    cash: Series,
}

impl CashObserver {
    pub fn new() -> Self {
        Self { cash: Series::new("cash") }
    }

    pub fn cash(&self) -> &Series {
        &self.cash
    }
}

impl Default for CashObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for CashObserver {
    fn name(&self) -> &'static str {
        "Cash"
    }

    fn next(&mut self, step: usize, broker: &dyn Broker) -> Result<()> {
        self.cash.push(step, broker.cash()?);
        Ok(())
    }

    fn series(&self) -> Vec<&Series> {
        vec![&self.cash]
    }
}
