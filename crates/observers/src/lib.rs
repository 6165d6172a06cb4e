// In crates/observers/src/lib.rs

use broker::Broker;

pub mod broker_value;
pub mod cash;
pub mod error;
pub mod factory;
pub mod fund;
pub mod types;
pub mod value;

// Re-export public types
pub use broker_value::BrokerObserver;
pub use cash::CashObserver;
pub use error::{Error, Result};
pub use factory::{create, create_observers, ObserverKind};
pub use fund::{FundSharesObserver, FundValueObserver};
pub use types::{Series, SeriesPoint};
pub use value::ValueObserver;

/// The universal interface for a passive state sampler.
///
/// An observer appends one sample per simulation step to each of its series. The
/// broker is handed in on every call and only by shared reference, so sampling
/// can never alter the account.
pub trait Observer {
    /// The name of the observer (e.g., "Value").
    fn name(&self) -> &'static str;

    /// Called once before the first step.
    fn start(&mut self, _broker: &dyn Broker) -> Result<()> {
        Ok(())
    }

    /// Samples the broker for `step`. The broker has already processed the step.
    fn next(&mut self, step: usize, broker: &dyn Broker) -> Result<()>;

    fn series(&self) -> Vec<&Series>;
}
