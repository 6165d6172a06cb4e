// In crates/commission/src/scheme.rs

//! Commission schemes: how trading costs and margin are computed for a class of
//! instruments.
//!
//! A scheme is described by a [`CommissionParams`] set (which can be read from the
//! `[broker.default_commission]` table and the `[[broker.commissions]]` entries of
//! the configuration file) and frozen into an immutable [`CommissionScheme`].
//!
//! ```toml
//! [[broker.commissions]]
//! symbol = "ES"
//! params = { commission = 2.0, margin = 2000.0, mult = 10.0 }
//! ```

use core_types::Position;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the `commission` parameter is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommType {
    /// A rate applied to the traded value.
    Percentage,
    /// A fixed amount per unit traded.
    Fixed,
}

/// The raw parameters of a commission scheme, exactly as given by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionParams {
    #[serde(default)]
    pub commission: Decimal,
    /// Margin per contract. Its presence marks a derivative-like instrument when
    /// `comm_type` is not given.
    #[serde(default)]
    pub margin: Option<Decimal>,
    #[serde(default = "default_one")]
    pub mult: Decimal,
    #[serde(default)]
    pub comm_type: Option<CommType>,
    /// When false, a percentage commission is given in percent (2.0 means 2%).
    #[serde(default = "default_true")]
    pub percabs: bool,
    #[serde(default)]
    pub stocklike: bool,
    /// Yearly interest charged on short positions.
    #[serde(default)]
    pub interest: Decimal,
    /// Also charge interest on long positions.
    #[serde(default)]
    pub interest_long: bool,
    #[serde(default = "default_one")]
    pub leverage: Decimal,
    /// Compute the margin from the price instead of using `margin`.
    #[serde(default)]
    pub automargin: bool,
}

fn default_one() -> Decimal {
    Decimal::ONE
}

fn default_true() -> bool {
    true
}

impl Default for CommissionParams {
    fn default() -> Self {
        Self {
            commission: Decimal::ZERO,
            margin: None,
            mult: Decimal::ONE,
            comm_type: None,
            percabs: true,
            stocklike: false,
            interest: Decimal::ZERO,
            interest_long: false,
            leverage: Decimal::ONE,
            automargin: false,
        }
    }
}

impl CommissionParams {
    /// A percentage scheme for stock-like instruments.
    pub fn percentage(commission: Decimal) -> Self {
        Self {
            commission,
            comm_type: Some(CommType::Percentage),
            stocklike: true,
            ..Self::default()
        }
    }

    /// A fixed-per-contract scheme for futures-like instruments.
    pub fn futures(commission: Decimal, margin: Decimal, mult: Decimal) -> Self {
        Self {
            commission,
            margin: Some(margin),
            mult,
            ..Self::default()
        }
    }
}

/// An immutable commission scheme.
///
/// Keeps the parameters it was built from untouched and the effective values
/// resolved once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionScheme {
    params: CommissionParams,
    comm_type: CommType,
    stocklike: bool,
    rate: Decimal,
    margin: Decimal,
    credit_rate: Decimal,
}

impl CommissionScheme {
    /// Builds a scheme from its parameters.
    ///
    /// Without an explicit `comm_type`, a given margin selects a fixed, futures-like
    /// scheme; otherwise a percentage, stock-like scheme is used. Derivative-like
    /// schemes without a margin use a margin of 1.
    /// # Returns
    /// * `Err(Error::InvalidParameters)` when a multiplier, leverage, commission or
    ///   margin is out of range.
    pub fn new(params: CommissionParams) -> Result<Self> {
        if params.mult <= Decimal::ZERO {
            return Err(Error::InvalidParameters(format!("mult must be positive, got {}", params.mult)));
        }
        if params.leverage <= Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "leverage must be positive, got {}",
                params.leverage
            )));
        }
        if params.commission < Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "commission must not be negative, got {}",
                params.commission
            )));
        }
        if let Some(margin) = params.margin {
            if margin < Decimal::ZERO {
                return Err(Error::InvalidParameters(format!("margin must not be negative, got {}", margin)));
            }
        }

        let has_margin = params.margin.is_some_and(|m| !m.is_zero());
        let (comm_type, stocklike) = match params.comm_type {
            Some(comm_type) => (comm_type, params.stocklike),
            None if has_margin => (CommType::Fixed, false),
            None => (CommType::Percentage, true),
        };

        let margin = match params.margin {
            Some(margin) if !margin.is_zero() => margin,
            _ if !stocklike => Decimal::ONE,
            _ => Decimal::ZERO,
        };

        let rate = if comm_type == CommType::Percentage && !params.percabs {
            params.commission / dec!(100)
        } else {
            params.commission
        };

        let credit_rate = params.interest / dec!(365);

        Ok(Self {
            params,
            comm_type,
            stocklike,
            rate,
            margin,
            credit_rate,
        })
    }

    /// The parameters exactly as given to [`CommissionScheme::new`].
    pub fn params(&self) -> &CommissionParams {
        &self.params
    }

    pub fn comm_type(&self) -> CommType {
        self.comm_type
    }

    pub fn is_stocklike(&self) -> bool {
        self.stocklike
    }

    /// The commission rate after percent normalisation.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn mult(&self) -> Decimal {
        self.params.mult
    }

    pub fn leverage(&self) -> Decimal {
        self.params.leverage
    }

    /// Daily interest rate derived from the yearly `interest`.
    pub fn credit_rate(&self) -> Decimal {
        self.credit_rate
    }

    /// Commission charged for trading `size` units at `price`.
    pub fn commission_for(&self, size: Decimal, price: Decimal) -> Decimal {
        match self.comm_type {
            CommType::Percentage => size.abs() * price * self.rate,
            CommType::Fixed => size.abs() * self.rate,
        }
    }

    /// Margin required per unit at `price`.
    pub fn margin_for(&self, price: Decimal) -> Decimal {
        if self.params.automargin {
            price * self.params.mult / self.params.leverage
        } else {
            self.margin
        }
    }

    /// Cash needed to open `size` units at `price`, commission excluded.
    pub fn operation_cost(&self, size: Decimal, price: Decimal) -> Decimal {
        if self.stocklike {
            size.abs() * price
        } else {
            size.abs() * self.margin_for(price)
        }
    }

    /// Profit or loss of `size` units moving from `price` to `new_price`.
    pub fn profit_and_loss(&self, size: Decimal, price: Decimal, new_price: Decimal) -> Decimal {
        size * (new_price - price) * self.params.mult
    }

    /// Value contributed to the account by `position` when marked at `mark`.
    pub fn position_value(&self, position: &Position, mark: Decimal) -> Decimal {
        if self.stocklike {
            position.size * mark
        } else {
            position.size.abs() * self.margin_for(position.price)
                + self.profit_and_loss(position.size, position.price, mark)
        }
    }

    /// Interest owed on `position` over `days` at `price`.
    ///
    /// Short positions always pay; long positions only with `interest_long`.
    pub fn credit_interest(&self, position: &Position, price: Decimal, days: Decimal) -> Decimal {
        if self.credit_rate.is_zero() || position.is_flat() {
            return Decimal::ZERO;
        }
        if position.size.is_sign_positive() && !self.params.interest_long {
            return Decimal::ZERO;
        }
        position.size.abs() * price * self.credit_rate * days
    }
}

impl Default for CommissionScheme {
    /// Zero-cost percentage scheme for stock-like instruments.
    fn default() -> Self {
        Self {
            params: CommissionParams::default(),
            comm_type: CommType::Percentage,
            stocklike: true,
            rate: Decimal::ZERO,
            margin: Decimal::ZERO,
            credit_rate: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_without_comm_type_means_fixed_futures_scheme() {
        let scheme = CommissionScheme::new(CommissionParams::futures(dec!(2), dec!(2000), dec!(10))).unwrap();
        assert_eq!(scheme.comm_type(), CommType::Fixed);
        assert!(!scheme.is_stocklike());
        assert_eq!(scheme.commission_for(dec!(-3), dec!(4000)), dec!(6));
        assert_eq!(scheme.operation_cost(dec!(3), dec!(4000)), dec!(6000));
        assert_eq!(scheme.profit_and_loss(dec!(2), dec!(100), dec!(103)), dec!(60));
    }

    #[test]
    fn no_margin_means_percentage_stock_scheme() {
        let params = CommissionParams {
            commission: dec!(0.5),
            percabs: false,
            ..CommissionParams::default()
        };
        let scheme = CommissionScheme::new(params.clone()).unwrap();
        assert_eq!(scheme.comm_type(), CommType::Percentage);
        assert!(scheme.is_stocklike());
        assert_eq!(scheme.rate(), dec!(0.005));
        assert_eq!(scheme.commission_for(dec!(10), dec!(100)), dec!(5));
        // The raw parameters are kept unchanged.
        assert_eq!(scheme.params(), &params);
    }

    #[test]
    fn derivative_without_margin_defaults_to_unit_margin() {
        let params = CommissionParams {
            comm_type: Some(CommType::Fixed),
            stocklike: false,
            ..CommissionParams::default()
        };
        let scheme = CommissionScheme::new(params).unwrap();
        assert_eq!(scheme.margin_for(dec!(50)), dec!(1));
    }

    #[test]
    fn automargin_uses_price_mult_and_leverage() {
        let params = CommissionParams {
            margin: Some(dec!(100)),
            mult: dec!(5),
            leverage: dec!(2),
            automargin: true,
            ..CommissionParams::default()
        };
        let scheme = CommissionScheme::new(params).unwrap();
        assert_eq!(scheme.margin_for(dec!(40)), dec!(100));
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let bad_mult = CommissionParams { mult: dec!(0), ..CommissionParams::default() };
        assert!(matches!(CommissionScheme::new(bad_mult), Err(Error::InvalidParameters(_))));

        let bad_leverage = CommissionParams { leverage: dec!(-1), ..CommissionParams::default() };
        assert!(CommissionScheme::new(bad_leverage).is_err());

        let bad_margin = CommissionParams { margin: Some(dec!(-5)), ..CommissionParams::default() };
        assert!(CommissionScheme::new(bad_margin).is_err());
    }

    #[test]
    fn credit_interest_applies_to_shorts_only_by_default() {
        let params = CommissionParams { interest: dec!(0.365), ..CommissionParams::default() };
        let scheme = CommissionScheme::new(params).unwrap();
        let long = Position::new(dec!(10), dec!(100));
        let short = Position::new(dec!(-10), dec!(100));
        assert_eq!(scheme.credit_interest(&long, dec!(100), dec!(1)), dec!(0));
        assert_eq!(scheme.credit_interest(&short, dec!(100), dec!(1)), dec!(1));
    }
}
