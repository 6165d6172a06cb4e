// In crates/core-types/src/types.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use toml::Value;

use crate::{Error, Result};

/// Identifies a tradeable instrument (e.g., "ORCL", "ES-FUT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// The direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The sign applied to an unsigned order size.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

/// How an order is to be executed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecType {
    #[default]
    Market,
    Close,
    Limit,
    Stop,
    StopLimit,
    StopTrail,
    StopTrailLimit,
    /// Replayed from order history; backends create these themselves.
    Historical,
}

impl ExecType {
    /// Whether the execution type needs a trigger or limit price.
    pub fn requires_price(&self) -> bool {
        matches!(self, ExecType::Limit | ExecType::Stop | ExecType::StopLimit)
    }

    pub fn is_trailing(&self) -> bool {
        matches!(self, ExecType::StopTrail | ExecType::StopTrailLimit)
    }
}

/// Backend-assigned order reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything a caller can say about an order it wants to place.
///
/// Only `owner`, `symbol` and `size` are mandatory; the rest is set through the
/// builder-style methods. `extensions` is an open bag for backend-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    /// Who placed the order (usually a strategy name).
    pub owner: String,
    pub symbol: Symbol,
    /// Unsigned quantity. The side is given by `buy`/`sell`.
    pub size: Decimal,
    /// Limit or trigger price, depending on `exec_type`.
    pub price: Option<Decimal>,
    /// Limit price used once a `StopLimit` has been triggered.
    pub plimit: Option<Decimal>,
    pub exec_type: Option<ExecType>,
    /// The order expires once the broker clock moves past this instant.
    pub valid: Option<DateTime<Utc>>,
    /// Groups orders into logical trades; several trades may be open per symbol.
    #[serde(default)]
    pub trade_id: u32,
    /// One-cancels-other link.
    pub oco: Option<OrderId>,
    pub trail_amount: Option<Decimal>,
    pub trail_percent: Option<Decimal>,
    #[serde(default)]
    pub extensions: BTreeMap<String, Value>,
}

impl OrderParams {
    pub fn new(owner: impl Into<String>, symbol: Symbol, size: Decimal) -> Self {
        Self {
            owner: owner.into(),
            symbol,
            size,
            price: None,
            plimit: None,
            exec_type: None,
            valid: None,
            trade_id: 0,
            oco: None,
            trail_amount: None,
            trail_percent: None,
            extensions: BTreeMap::new(),
        }
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn plimit(mut self, plimit: Decimal) -> Self {
        self.plimit = Some(plimit);
        self
    }

    pub fn exec_type(mut self, exec_type: ExecType) -> Self {
        self.exec_type = Some(exec_type);
        self
    }

    pub fn valid_until(mut self, deadline: DateTime<Utc>) -> Self {
        self.valid = Some(deadline);
        self
    }

    pub fn trade_id(mut self, trade_id: u32) -> Self {
        self.trade_id = trade_id;
        self
    }

    pub fn oco(mut self, other: OrderId) -> Self {
        self.oco = Some(other);
        self
    }

    pub fn trail_amount(mut self, amount: Decimal) -> Self {
        self.trail_amount = Some(amount);
        self
    }

    pub fn trail_percent(mut self, percent: Decimal) -> Self {
        self.trail_percent = Some(percent);
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// The execution type, `Market` when none was given.
    pub fn effective_exec_type(&self) -> ExecType {
        self.exec_type.unwrap_or_default()
    }

    /// Checks the parameter combination before a backend accepts the order.
    pub fn validate(&self) -> Result<()> {
        if self.size <= Decimal::ZERO {
            return Err(Error::InvalidOrder {
                reason: format!("size must be positive, got {}", self.size),
            });
        }

        let exec_type = self.effective_exec_type();
        if exec_type == ExecType::Historical {
            return Err(Error::InvalidOrder {
                reason: "historical orders are only created by order history replay".to_string(),
            });
        }

        if exec_type.requires_price() && self.price.is_none() {
            return Err(Error::InvalidOrder {
                reason: format!("{:?} order requires a price", exec_type),
            });
        }

        if self.trail_amount.is_some() && self.trail_percent.is_some() {
            return Err(Error::InvalidOrder {
                reason: "trail amount and trail percent are mutually exclusive".to_string(),
            });
        }

        if exec_type.is_trailing() && self.trail_amount.is_none() && self.trail_percent.is_none() {
            return Err(Error::InvalidOrder {
                reason: format!("{:?} order requires a trail amount or percent", exec_type),
            });
        }

        Ok(())
    }
}

/// Lifecycle status of an order inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Submitted,
    Accepted,
    Partial,
    Completed,
    Canceled,
    Expired,
    /// Not enough cash to cover the operation.
    Margin,
    Rejected,
}

impl OrderStatus {
    pub fn is_alive(&self) -> bool {
        matches!(self, OrderStatus::Submitted | OrderStatus::Accepted | OrderStatus::Partial)
    }
}

/// Execution details of a completed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    /// Signed quantity (positive for buys).
    pub size: Decimal,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An order handle as returned by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub params: OrderParams,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub fill: Option<Fill>,
}

impl Order {
    pub fn new(id: OrderId, side: Side, params: OrderParams, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id,
            side,
            params,
            status: OrderStatus::Submitted,
            created_at,
            fill: None,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// Size with the side applied.
    pub fn signed_size(&self) -> Decimal {
        self.params.size * self.side.sign()
    }
}

/// Net holding in a single instrument.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Signed quantity; negative when short.
    pub size: Decimal,
    /// Average entry price of the open quantity.
    pub price: Decimal,
}

impl Position {
    pub fn new(size: Decimal, price: Decimal) -> Self {
        Self { size, price }
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    /// Applies a signed execution of `delta` at `price`.
    ///
    /// Returns `(opened, closed)`, both signed like `delta`: the quantity that
    /// increased exposure and the quantity that reduced it.
    pub fn update(&mut self, delta: Decimal, price: Decimal) -> (Decimal, Decimal) {
        let old_size = self.size;
        self.size += delta;

        if self.size.is_zero() {
            self.price = Decimal::ZERO;
            return (Decimal::ZERO, delta);
        }

        if old_size.is_zero() {
            self.price = price;
            return (delta, Decimal::ZERO);
        }

        let same_direction = old_size.is_sign_positive() == delta.is_sign_positive();
        if same_direction {
            self.price = (self.price * old_size + price * delta) / self.size;
            (delta, Decimal::ZERO)
        } else if self.size.is_sign_positive() == old_size.is_sign_positive() {
            // Reduced but not reversed.
            (Decimal::ZERO, delta)
        } else {
            self.price = price;
            (self.size, -old_size)
        }
    }
}

/// Prices observed at one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub prices: HashMap<Symbol, Decimal>,
}

impl MarketSnapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, prices: HashMap::new() }
    }

    pub fn with_price(mut self, symbol: Symbol, price: Decimal) -> Self {
        self.prices.insert(symbol, price);
        self
    }

    pub fn price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }
}

/// An order that already happened elsewhere and is replayed into a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOrder {
    pub timestamp: DateTime<Utc>,
    pub symbol: Symbol,
    /// Signed quantity; negative for sells.
    pub size: Decimal,
    pub price: Decimal,
}

/// A point of recorded fund history: share count and value per share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub timestamp: DateTime<Utc>,
    pub shares: Decimal,
    pub value: Decimal,
}
