// In crates/observers/src/broker_value.rs

use broker::Broker;

use crate::types::FundSwitch;
use crate::{Observer, Result, Series};

/// Label of the value series when it carries fund share values.
pub const FUND_VALUE_LABEL: &str = "FundValue";

/// Samples cash and value together.
///
/// In fund mode only the value of one fund share is sampled: the cash series
/// stays empty and the value series is relabelled [`FUND_VALUE_LABEL`].
#[derive(Debug, Clone)]
pub struct BrokerObserver {
    fund: FundSwitch,
    cash: Series,
    value: Series,
}

impl BrokerObserver {
    pub fn new(fund: Option<bool>) -> Self {
        Self {
            fund: FundSwitch::new(fund),
            cash: Series::new("cash"),
            value: Series::new("value"),
        }
    }

    pub fn cash(&self) -> &Series {
        &self.cash
    }

    pub fn value(&self) -> &Series {
        &self.value
    }

    pub fn fund_mode(&self) -> Option<bool> {
        self.fund.resolved()
    }
}

impl Observer for BrokerObserver {
    fn name(&self) -> &'static str {
        "Broker"
    }

    fn start(&mut self, broker: &dyn Broker) -> Result<()> {
        let fund = self.fund.resolve(broker);
        if fund {
            self.value.set_label(FUND_VALUE_LABEL);
        }
        tracing::debug!(observer = self.name(), fund, "Observer started.");
        Ok(())
    }

    fn next(&mut self, step: usize, broker: &dyn Broker) -> Result<()> {
        if self.fund.get(self.name())? {
            self.value.push(step, broker.fund_value()?);
        } else {
            // Read both before appending so a failure leaves the series aligned.
            let cash = broker.cash()?;
            let value = broker.value(None)?;
            self.cash.push(step, cash);
            self.value.push(step, value);
        }
        Ok(())
    }

    fn series(&self) -> Vec<&Series> {
        vec![&self.cash, &self.value]
    }
}
