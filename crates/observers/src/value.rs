// In crates/observers/src/value.rs

use broker::Broker;

use crate::types::FundSwitch;
use crate::{Observer, Result, Series};

/// Samples the account value, or the value of one fund share in fund mode.
///
/// `fund` overrides the broker's fund mode; `None` follows the broker. The
/// choice is settled once, in [`Observer::start`].
#[derive(Debug, Clone)]
pub struct ValueObserver {
    fund: FundSwitch,
    value: Series,
}

impl ValueObserver {
    pub fn new(fund: Option<bool>) -> Self {
        Self {
            fund: FundSwitch::new(fund),
            value: Series::new("value"),
        }
    }

    pub fn value(&self) -> &Series {
        &self.value
    }

    /// The fund mode settled at start, if started.
    pub fn fund_mode(&self) -> Option<bool> {
        self.fund.resolved()
    }
}

impl Observer for ValueObserver {
    fn name(&self) -> &'static str {
        "Value"
    }

    fn start(&mut self, broker: &dyn Broker) -> Result<()> {
        let fund = self.fund.resolve(broker);
        tracing::debug!(observer = self.name(), fund, "Observer started.");
        Ok(())
    }

    fn next(&mut self, step: usize, broker: &dyn Broker) -> Result<()> {
        let value = if self.fund.get(self.name())? {
            broker.fund_value()?
        } else {
            broker.value(None)?
        };
        self.value.push(step, value);
        Ok(())
    }

    fn series(&self) -> Vec<&Series> {
        vec![&self.value]
    }
}
