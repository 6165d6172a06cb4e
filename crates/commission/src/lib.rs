// In crates/commission/src/lib.rs

//! Commission schemes and the per-instrument registry that brokers resolve them from.

pub mod error;
pub mod registry;
pub mod scheme;

pub use error::{Error, Result};
pub use registry::{CommissionKey, CommissionRegistry};
pub use scheme::{CommType, CommissionParams, CommissionScheme};
