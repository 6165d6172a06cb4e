// In app/src/strategy.rs

use broker::{Broker, SimulatedBroker};
use core_types::{MarketSnapshot, OrderId, OrderParams, OrderStatus, Symbol};
use num_traits::cast::ToPrimitive;
use rust_decimal::Decimal;
use ta::indicators::SimpleMovingAverage as Sma;
use ta::Next;

#[derive(Debug, Clone)]
pub struct MultiTradeSettings {
    pub symbol: Symbol,
    pub period: usize,
    pub stake: Decimal,
    /// Open long positions only.
    pub only_long: bool,
    /// Cycle new entries through trade ids 0, 1, 2 instead of always using 0.
    pub multi_trade: bool,
}

/// Buys when the close crosses above its simple moving average and sells when it
/// crosses below, closing any open position first. Only one order is in flight
/// at a time.
#[derive(Debug)]
pub struct MultiTradeStrategy {
    settings: MultiTradeSettings,
    sma: Sma,
    samples: usize,
    last_diff: Option<f64>,
    trade_ids: std::iter::Cycle<std::vec::IntoIter<u32>>,
    current_trade_id: u32,
    active: Option<OrderId>,
    completed: usize,
}

impl MultiTradeStrategy {
    pub fn new(settings: MultiTradeSettings) -> anyhow::Result<Self> {
        let sma = Sma::new(settings.period)
            .map_err(|e| anyhow::anyhow!("Invalid SMA period {}: {:?}", settings.period, e))?;
        let ids = if settings.multi_trade { vec![0, 1, 2] } else { vec![0] };

        Ok(Self {
            settings,
            sma,
            samples: 0,
            last_diff: None,
            trade_ids: ids.into_iter().cycle(),
            current_trade_id: 0,
            active: None,
            completed: 0,
        })
    }

    pub fn name(&self) -> &'static str {
        "MultiTrade"
    }

    /// Number of orders that completed during the run.
    pub fn completed_orders(&self) -> usize {
        self.completed
    }

    pub fn on_step(&mut self, step: usize, snapshot: &MarketSnapshot, broker: &mut SimulatedBroker) -> anyhow::Result<()> {
        self.drain_notifications(broker);

        let Some(close) = snapshot.price(&self.settings.symbol) else {
            return Ok(());
        };
        let close_f = close.to_f64().unwrap_or(0.0);
        let average = self.sma.next(close_f);
        self.samples += 1;
        if self.samples < self.settings.period {
            return Ok(());
        }

        let diff = close_f - average;
        let previous = self.last_diff.replace(diff);
        if self.active.is_some() {
            return Ok(());
        }
        let Some(previous) = previous else {
            return Ok(());
        };

        let position = broker.position(&self.settings.symbol)?;
        if previous < 0.0 && diff > 0.0 {
            if !position.is_flat() {
                tracing::info!(step, %close, trade_id = self.current_trade_id, "Closing short.");
                self.close(broker, position.size)?;
            }
            self.current_trade_id = self.next_trade_id();
            tracing::info!(step, %close, trade_id = self.current_trade_id, "Buy created.");
            let order = broker.buy(self.params().trade_id(self.current_trade_id))?;
            self.active = Some(order.id);
        } else if previous > 0.0 && diff < 0.0 {
            if !position.is_flat() {
                tracing::info!(step, %close, trade_id = self.current_trade_id, "Closing long.");
                self.close(broker, position.size)?;
            }
            if !self.settings.only_long {
                self.current_trade_id = self.next_trade_id();
                tracing::info!(step, %close, trade_id = self.current_trade_id, "Sell created.");
                let order = broker.sell(self.params().trade_id(self.current_trade_id))?;
                self.active = Some(order.id);
            }
        }
        Ok(())
    }

    fn params(&self) -> OrderParams {
        OrderParams::new(self.name(), self.settings.symbol.clone(), self.settings.stake)
    }

    fn next_trade_id(&mut self) -> u32 {
        self.trade_ids.next().unwrap_or(0)
    }

    fn close(&mut self, broker: &mut SimulatedBroker, size: Decimal) -> anyhow::Result<()> {
        let params = OrderParams::new(self.name(), self.settings.symbol.clone(), size.abs())
            .trade_id(self.current_trade_id);
        let order = if size.is_sign_positive() {
            broker.sell(params)?
        } else {
            broker.buy(params)?
        };
        self.active = Some(order.id);
        Ok(())
    }

    fn drain_notifications(&mut self, broker: &mut SimulatedBroker) {
        while let Some(order) = broker.pop_notification() {
            match order.status {
                OrderStatus::Submitted | OrderStatus::Accepted => continue,
                OrderStatus::Completed => {
                    self.completed += 1;
                    if let Some(fill) = &order.fill {
                        tracing::info!(
                            order = %order.id,
                            side = ?order.side,
                            price = %fill.price,
                            commission = %fill.commission,
                            trade_id = order.params.trade_id,
                            "Order completed."
                        );
                    }
                }
                status => {
                    tracing::warn!(order = %order.id, ?status, "Order did not complete.");
                }
            }
            if self.active.is_some_and(|id| id == order.id) && !order.is_alive() {
                self.active = None;
            }
        }
    }
}
