// In crates/observers/src/factory.rs

use std::fmt;
use std::str::FromStr;

use crate::{
    BrokerObserver, CashObserver, Error, FundSharesObserver, FundValueObserver, Observer, Result,
    ValueObserver,
};

/// The observers that can be built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    Cash,
    Value,
    /// Cash and value together.
    Broker,
    FundValue,
    FundShares,
}

impl FromStr for ObserverKind {
    type Err = Error;

    /// Parses a configured observer name. Case and `_`/`-` separators are ignored.
    fn from_str(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "cash" => Ok(Self::Cash),
            "value" => Ok(Self::Value),
            "broker" | "cashvalue" => Ok(Self::Broker),
            "fundvalue" | "fundsharevalue" | "fundval" => Ok(Self::FundValue),
            "fundshares" => Ok(Self::FundShares),
            _ => Err(Error::UnknownObserver(name.to_string())),
        }
    }
}

impl fmt::Display for ObserverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cash => "cash",
            Self::Value => "value",
            Self::Broker => "broker",
            Self::FundValue => "fund_value",
            Self::FundShares => "fund_shares",
        };
        f.write_str(name)
    }
}

/// Builds an observer. `fund` is the fund-mode override for the observers that
/// resolve one; the others ignore it.
pub fn create(kind: ObserverKind, fund: Option<bool>) -> Box<dyn Observer> {
    match kind {
        ObserverKind::Cash => Box::new(CashObserver::new()),
        ObserverKind::Value => Box::new(ValueObserver::new(fund)),
        ObserverKind::Broker => Box::new(BrokerObserver::new(fund)),
        ObserverKind::FundValue => Box::new(FundValueObserver::new()),
        ObserverKind::FundShares => Box::new(FundSharesObserver::new()),
    }
}

/// Builds the observers named in configuration, in order.
pub fn create_observers<S: AsRef<str>>(names: &[S], fund: Option<bool>) -> Result<Vec<Box<dyn Observer>>> {
    let mut observers = Vec::with_capacity(names.len());
    for name in names {
        let kind: ObserverKind = name.as_ref().parse()?;
        tracing::debug!(%kind, "Creating observer.");
        observers.push(create(kind, fund));
    }
    Ok(observers)
}
