// In crates/broker/src/types.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    /// Cash the account starts the run with.
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,

    /// Reject orders the account cannot pay for (status `Margin`).
    #[serde(default = "default_check_submit")]
    pub check_submit: bool,

    /// The simulated slippage fraction for market and stop fills (e.g., 0.0005 for 0.05%).
    #[serde(default)]
    pub slippage_percent: Decimal,
}

fn default_starting_cash() -> Decimal {
    dec!(10_000)
}

fn default_check_submit() -> bool {
    true
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            starting_cash: default_starting_cash(),
            check_submit: true,
            slippage_percent: Decimal::ZERO,
        }
    }
}
