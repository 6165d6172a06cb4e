// In crates/broker/src/fund.rs

use core_types::FundRecord;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{Error, Result};

/// Value per share a fund starts at unless told otherwise.
pub const DEFAULT_FUND_START_VALUE: Decimal = dec!(100);

/// Fund-share bookkeeping shared by backends that support fund mode.
///
/// The ledger always tracks shares and value per share; `enabled` only says which
/// of the two valuations the account is reported in.
#[derive(Debug, Clone, PartialEq)]
pub struct FundLedger {
    enabled: bool,
    start_value: Decimal,
    shares: Decimal,
    nav: Decimal,
}

impl Default for FundLedger {
    fn default() -> Self {
        Self {
            enabled: false,
            start_value: DEFAULT_FUND_START_VALUE,
            shares: Decimal::ONE,
            nav: DEFAULT_FUND_START_VALUE,
        }
    }
}

impl FundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_value(&self) -> Decimal {
        self.start_value
    }

    pub fn shares(&self) -> Decimal {
        self.shares
    }

    /// Current value of one share.
    pub fn nav(&self) -> Decimal {
        self.nav
    }

    pub fn set_mode(&mut self, enabled: bool, start_value: Option<Decimal>) -> Result<()> {
        if let Some(value) = start_value {
            if value <= Decimal::ZERO {
                return Err(Error::InvalidFundStartValue(value));
            }
            self.start_value = value;
        }
        self.enabled = enabled;
        Ok(())
    }

    /// Seeds the share count so that one share is worth `start_value`.
    pub fn begin(&mut self, total_value: Decimal) {
        self.nav = self.start_value;
        self.shares = if total_value > Decimal::ZERO {
            total_value / self.start_value
        } else {
            Decimal::ZERO
        };
    }

    pub fn revalue(&mut self, total_value: Decimal) {
        if !self.shares.is_zero() {
            self.nav = total_value / self.shares;
        }
    }

    /// Issues (or redeems, for negative `cash`) shares at the current value per
    /// share. Returns the share delta.
    pub fn issue(&mut self, cash: Decimal) -> Decimal {
        if self.nav.is_zero() {
            return Decimal::ZERO;
        }
        let delta = cash / self.nav;
        self.shares += delta;
        delta
    }

    /// Replaces shares and value per share with a recorded history point.
    pub fn apply(&mut self, record: &FundRecord) {
        self.shares = record.shares;
        self.nav = record.value;
    }
}
