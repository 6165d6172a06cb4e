// In crates/observers/src/fund.rs

use broker::Broker;

use crate::{Observer, Result, Series};

/// Samples the value of one fund share, whatever the broker's fund mode.
#[derive(Debug, Clone)]
pub struct FundValueObserver {
    fundval: Series,
}

impl FundValueObserver {
    pub fn new() -> Self {
        Self { fundval: Series::new("fundval") }
    }

    pub fn fund_value(&self) -> &Series {
        &self.fundval
    }
}

impl Default for FundValueObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for FundValueObserver {
    fn name(&self) -> &'static str {
        "FundValue"
    }

    fn next(&mut self, step: usize, broker: &dyn Broker) -> Result<()> {
        self.fundval.push(step, broker.fund_value()?);
        Ok(())
    }

    fn series(&self) -> Vec<&Series> {
        vec![&self.fundval]
    }
}

/// Samples the number of fund shares.
#[derive(Debug, Clone)]
pub struct FundSharesObserver {
    fund_shares: Series,
}

impl FundSharesObserver {
    pub fn new() -> Self {
        Self { fund_shares: Series::new("fund_shares") }
    }

    pub fn fund_shares(&self) -> &Series {
        &self.fund_shares
    }
}

impl Default for FundSharesObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for FundSharesObserver {
    fn name(&self) -> &'static str {
        "FundShares"
    }

    fn next(&mut self, step: usize, broker: &dyn Broker) -> Result<()> {
        self.fund_shares.push(step, broker.fund_shares()?);
        Ok(())
    }

    fn series(&self) -> Vec<&Series> {
        vec![&self.fund_shares]
    }
}
