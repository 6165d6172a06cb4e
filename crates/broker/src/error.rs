// In crates/broker/src/error.rs

use core_types::OrderId;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The backend does not provide a capability of the broker contract.
    #[error("Broker capability not implemented: {capability}")]
    NotImplemented { capability: &'static str },

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("Unknown order {0}")]
    UnknownOrder(OrderId),

    #[error("Fund start value must be positive, got {0}")]
    InvalidFundStartValue(Decimal),

    #[error("Commission error: {0}")]
    Commission(#[from] commission::Error),

    #[error(transparent)]
    Order(#[from] core_types::Error),
}

impl Error {
    pub fn not_implemented(capability: &'static str) -> Self {
        Error::NotImplemented { capability }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
