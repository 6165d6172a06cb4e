// In crates/observers/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Broker error: {0}")]
    Broker(#[from] broker::Error),

    #[error("Observer '{observer}' sampled before it was started")]
    NotStarted { observer: &'static str },

    #[error("Unknown observer: {0}")]
    UnknownObserver(String),
}

pub type Result<T> = std::result::Result<T, Error>;
