// In crates/broker/src/simulated.rs

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use commission::CommissionScheme;
use core_types::{
    ExecType, Fill, FundRecord, HistoricalOrder, MarketSnapshot, Order, OrderId, OrderParams,
    OrderStatus, Position, Side, Symbol,
};
use rust_decimal::Decimal;

use crate::fund::FundLedger;
use crate::types::SimulationSettings;
use crate::{Broker, BrokerCore, Error, MarkToMarket, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// Trigger state of stop and trailing-stop orders.
#[derive(Debug, Clone, Copy, Default)]
struct Trigger {
    triggered: bool,
    stop: Option<Decimal>,
}

/// A deterministic broker that fills orders against the prices of the current step.
///
/// Orders are accepted immediately and executed on the following call to
/// [`Broker::next`], once the driver has pushed that step's prices through
/// [`MarkToMarket::mark`].
#[derive(Debug)]
pub struct SimulatedBroker {
    core: BrokerCore,
    settings: SimulationSettings,
    cash: Decimal,
    positions: HashMap<Symbol, Position>,
    marks: HashMap<Symbol, Decimal>,
    now: Option<DateTime<Utc>>,
    interest_accrued_at: Option<DateTime<Utc>>,
    orders: BTreeMap<OrderId, Order>,
    /// Alive orders in submission order.
    pending: Vec<OrderId>,
    triggers: HashMap<OrderId, Trigger>,
    /// One-cancels-other group of each linked order; chained links share one group.
    oco_groups: HashMap<OrderId, OrderId>,
    /// Orders whose status changes are not notified.
    silent: HashSet<OrderId>,
    cash_additions: VecDeque<Decimal>,
    order_history: VecDeque<HistoricalOrder>,
    notify_history: bool,
    fund_history: VecDeque<FundRecord>,
    fund: FundLedger,
    notifications: VecDeque<Order>,
    next_order_id: u64,
}

impl SimulatedBroker {
    /// Creates a new `SimulatedBroker` with a zero-cost default commission scheme.
    pub fn new(settings: SimulationSettings) -> Self {
        Self::with_default_commission(settings, CommissionScheme::default())
    }

    pub fn with_default_commission(settings: SimulationSettings, default_commission: CommissionScheme) -> Self {
        Self {
            core: BrokerCore::new(default_commission),
            cash: settings.starting_cash,
            settings,
            positions: HashMap::new(),
            marks: HashMap::new(),
            now: None,
            interest_accrued_at: None,
            orders: BTreeMap::new(),
            pending: Vec::new(),
            triggers: HashMap::new(),
            oco_groups: HashMap::new(),
            silent: HashSet::new(),
            cash_additions: VecDeque::new(),
            order_history: VecDeque::new(),
            notify_history: false,
            fund_history: VecDeque::new(),
            fund: FundLedger::new(),
            notifications: VecDeque::new(),
            next_order_id: 1,
        }
    }

    /// Queues a deposit (or a withdrawal, when negative) for the next step.
    pub fn add_cash(&mut self, amount: Decimal) {
        self.cash_additions.push_back(amount);
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn pending_orders(&self) -> impl Iterator<Item = &Order> {
        self.pending.iter().filter_map(|id| self.orders.get(id))
    }

    /// Takes the oldest order status notification.
    pub fn pop_notification(&mut self) -> Option<Order> {
        self.notifications.pop_front()
    }

    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.now
    }

    fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    fn total_value(&self, symbols: Option<&[Symbol]>) -> Decimal {
        let positions: Decimal = self
            .positions
            .iter()
            .filter(|(symbol, _)| symbols.is_none_or(|list| list.contains(*symbol)))
            .map(|(symbol, position)| {
                let mark = self.marks.get(symbol).copied().unwrap_or(position.price);
                self.core.resolve_commission(symbol).position_value(position, mark)
            })
            .sum();
        self.cash + positions
    }

    fn create_order(&mut self, side: Side, params: OrderParams) -> Result<Order> {
        params.validate()?;
        let id = self.next_id();
        let order = Order::new(id, side, params, self.now);
        self.submit(order)?;
        self.orders.get(&id).cloned().ok_or(Error::UnknownOrder(id))
    }

    fn notify(&mut self, id: OrderId) {
        if self.silent.contains(&id) {
            return;
        }
        if let Some(order) = self.orders.get(&id) {
            self.notifications.push_back(order.clone());
        }
    }

    /// Moves an order out of the alive states and cancels its one-cancels-other peers.
    fn finish(&mut self, id: OrderId, status: OrderStatus) {
        if let Some(order) = self.orders.get_mut(&id) {
            order.status = status;
        }
        self.pending.retain(|pending| *pending != id);
        self.triggers.remove(&id);
        self.notify(id);
        self.cancel_oco_peers(id);
    }

    fn oco_group(&self, id: OrderId) -> OrderId {
        self.oco_groups.get(&id).copied().unwrap_or(id)
    }

    fn cancel_oco_peers(&mut self, id: OrderId) {
        let group = self.oco_group(id);
        let peers: Vec<OrderId> = self
            .pending
            .iter()
            .copied()
            .filter(|other| *other != id && self.oco_group(*other) == group)
            .filter(|other| self.orders.get(other).is_some_and(Order::is_alive))
            .collect();

        for peer in peers {
            tracing::debug!(order = %peer, cause = %id, "Cancelling one-cancels-other peer.");
            if let Some(order) = self.orders.get_mut(&peer) {
                order.status = OrderStatus::Canceled;
            }
            self.pending.retain(|pending| *pending != peer);
            self.triggers.remove(&peer);
            self.notify(peer);
        }
    }

    fn process_cash_additions(&mut self) {
        while let Some(amount) = self.cash_additions.pop_front() {
            let shares = self.fund.issue(amount);
            self.cash += amount;
            tracing::debug!(%amount, %shares, cash = %self.cash, "Processed cash addition.");
        }
    }

    fn accrue_interest(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.interest_accrued_at {
            let seconds = (now - last).num_seconds();
            if seconds > 0 {
                let days = Decimal::from(seconds) / Decimal::from(SECONDS_PER_DAY);
                let charge: Decimal = self
                    .positions
                    .iter()
                    .filter_map(|(symbol, position)| {
                        let mark = self.marks.get(symbol)?;
                        Some(self.core.resolve_commission(symbol).credit_interest(position, *mark, days))
                    })
                    .sum();
                if !charge.is_zero() {
                    self.cash -= charge;
                    tracing::debug!(%charge, %days, "Charged credit interest.");
                }
            }
        }
        self.interest_accrued_at = Some(now);
    }

    fn replay_order_history(&mut self, now: DateTime<Utc>) -> Result<()> {
        while let Some(record) = self.order_history.front().cloned() {
            if record.timestamp > now {
                break;
            }
            self.order_history.pop_front();

            if record.size.is_zero() {
                tracing::warn!(symbol = %record.symbol, "Skipping historical order without size.");
                continue;
            }

            let side = if record.size.is_sign_negative() { Side::Sell } else { Side::Buy };
            let params = OrderParams::new("history", record.symbol.clone(), record.size.abs())
                .price(record.price)
                .exec_type(ExecType::Historical);
            let id = self.next_id();
            let mut order = Order::new(id, side, params, Some(record.timestamp));
            order.status = OrderStatus::Accepted;
            self.orders.insert(id, order);
            if !self.notify_history {
                self.silent.insert(id);
            }
            self.notify(id);
            self.execute(id, record.price, record.timestamp, false)?;
        }
        Ok(())
    }

    fn process_pending(&mut self, now: DateTime<Utc>) -> Result<()> {
        let slippage = self.settings.slippage_percent;
        let check_cash = self.settings.check_submit;

        for id in self.pending.clone() {
            // Earlier fills in this loop may have cancelled one-cancels-other peers.
            let Some(order) = self.orders.get(&id).filter(|o| o.is_alive()).cloned() else {
                continue;
            };

            if order.params.valid.is_some_and(|deadline| now > deadline) {
                tracing::debug!(order = %id, "Order expired.");
                self.finish(id, OrderStatus::Expired);
                continue;
            }

            let Some(mark) = self.marks.get(&order.params.symbol).copied() else {
                continue;
            };

            let trigger = self.triggers.entry(id).or_default();
            if let Some(price) = match_price(&order, mark, trigger, slippage) {
                self.execute(id, price, now, check_cash)?;
            }
        }
        Ok(())
    }

    /// Executes the whole order at `price`, moving cash and the position.
    fn execute(&mut self, id: OrderId, price: Decimal, timestamp: DateTime<Utc>, check_cash: bool) -> Result<()> {
        let order = self.orders.get(&id).cloned().ok_or(Error::UnknownOrder(id))?;
        let symbol = order.params.symbol.clone();
        let scheme = self.core.resolve_commission(&symbol).clone();

        let size = order.signed_size();
        let mut position = self.positions.get(&symbol).copied().unwrap_or_default();
        let entry_price = position.price;
        let (opened, closed) = position.update(size, price);

        let commission = scheme.commission_for(size, price);
        let settlement = if scheme.is_stocklike() {
            -size * price
        } else {
            closed.abs() * scheme.margin_for(entry_price) + scheme.profit_and_loss(-closed, entry_price, price)
                - opened.abs() * scheme.margin_for(price)
        };
        let cash_delta = settlement - commission;

        if check_cash && !opened.is_zero() && self.cash + cash_delta < Decimal::ZERO {
            tracing::warn!(order = %id, %symbol, cash = %self.cash, required = %(-cash_delta), "Insufficient cash for order.");
            self.finish(id, OrderStatus::Margin);
            return Ok(());
        }

        self.cash += cash_delta;
        self.positions.insert(symbol.clone(), position);

        if let Some(order) = self.orders.get_mut(&id) {
            order.fill = Some(Fill { price, size, commission, timestamp });
        }
        tracing::debug!(order = %id, %symbol, %size, %price, %commission, cash = %self.cash, "Order executed.");
        self.finish(id, OrderStatus::Completed);
        Ok(())
    }

    fn apply_fund_history(&mut self, now: DateTime<Utc>) {
        while let Some(record) = self.fund_history.front().copied() {
            if record.timestamp > now {
                break;
            }
            self.fund_history.pop_front();
            self.fund.apply(&record);
        }
    }
}

/// The execution price of `order` at `mark`, if it executes at this step.
fn match_price(order: &Order, mark: Decimal, trigger: &mut Trigger, slippage: Decimal) -> Option<Decimal> {
    let buy = order.is_buy();
    let slipped = if buy {
        mark * (Decimal::ONE + slippage)
    } else {
        mark * (Decimal::ONE - slippage)
    };
    let limit_hit = |limit: Decimal| if buy { mark <= limit } else { mark >= limit };
    let stop_hit = |stop: Decimal| if buy { mark >= stop } else { mark <= stop };

    let params = &order.params;
    match params.effective_exec_type() {
        ExecType::Market | ExecType::Close | ExecType::Historical => Some(slipped),
        ExecType::Limit => {
            let limit = params.price?;
            limit_hit(limit).then_some(mark)
        }
        ExecType::Stop => {
            let stop = params.price?;
            stop_hit(stop).then_some(slipped)
        }
        ExecType::StopLimit => {
            if !trigger.triggered {
                trigger.triggered = stop_hit(params.price?);
            }
            if !trigger.triggered {
                return None;
            }
            let limit = params.plimit.or(params.price)?;
            limit_hit(limit).then_some(mark)
        }
        exec_type @ (ExecType::StopTrail | ExecType::StopTrailLimit) => {
            if !trigger.triggered {
                let distance = match (params.trail_amount, params.trail_percent) {
                    (Some(amount), _) => amount,
                    (None, Some(percent)) => mark * percent,
                    (None, None) => return None,
                };
                let candidate = if buy { mark + distance } else { mark - distance };
                let stop = match trigger.stop {
                    Some(previous) if buy => previous.min(candidate),
                    Some(previous) => previous.max(candidate),
                    None => candidate,
                };
                trigger.stop = Some(stop);
                trigger.triggered = stop_hit(stop);
            }
            if !trigger.triggered {
                return None;
            }
            if exec_type == ExecType::StopTrail {
                return Some(slipped);
            }
            let limit = params.plimit.or(trigger.stop)?;
            limit_hit(limit).then_some(mark)
        }
    }
}

impl Broker for SimulatedBroker {
    fn name(&self) -> &'static str {
        "SimulatedBroker"
    }

    fn core(&self) -> &BrokerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BrokerCore {
        &mut self.core
    }

    fn start(&mut self) -> Result<()> {
        self.init();
        self.core.mark_started();
        let value = self.total_value(None);
        self.fund.begin(value);
        tracing::info!(cash = %self.cash, fund_mode = self.fund.is_enabled(), "Simulated broker started.");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        tracing::info!(
            cash = %self.cash,
            value = %self.total_value(None),
            pending = self.pending.len(),
            "Simulated broker stopped."
        );
        Ok(())
    }

    fn cash(&self) -> Result<Decimal> {
        Ok(self.cash)
    }

    fn value(&self, symbols: Option<&[Symbol]>) -> Result<Decimal> {
        Ok(self.total_value(symbols))
    }

    fn fund_shares(&self) -> Result<Decimal> {
        Ok(self.fund.shares())
    }

    fn fund_value(&self) -> Result<Decimal> {
        Ok(self.fund.nav())
    }

    fn set_fund_mode(&mut self, enabled: bool, start_value: Option<Decimal>) -> Result<()> {
        self.fund.set_mode(enabled, start_value)?;
        if start_value.is_some() && self.core.is_started() {
            let value = self.total_value(None);
            self.fund.begin(value);
        }
        Ok(())
    }

    fn fund_mode(&self) -> bool {
        self.fund.is_enabled()
    }

    fn position(&self, symbol: &Symbol) -> Result<Position> {
        Ok(self.positions.get(symbol).copied().unwrap_or_default())
    }

    fn submit(&mut self, mut order: Order) -> Result<()> {
        order.params.validate()?;
        let id = order.id;
        if self.orders.contains_key(&id) {
            return Err(Error::OrderRejected { reason: format!("order {} was already submitted", id) });
        }
        self.next_order_id = self.next_order_id.max(id.0 + 1);
        if let Some(peer) = order.params.oco {
            let group = self.oco_group(peer);
            self.oco_groups.insert(peer, group);
            self.oco_groups.insert(id, group);
        }

        order.status = OrderStatus::Accepted;
        tracing::debug!(order = %id, symbol = %order.params.symbol, side = ?order.side, size = %order.params.size, "Order accepted.");
        self.orders.insert(id, order);
        self.pending.push(id);
        self.notify(id);
        Ok(())
    }

    fn cancel(&mut self, order: &Order) -> Result<()> {
        let id = order.id;
        let current = self.orders.get(&id).ok_or(Error::UnknownOrder(id))?;
        if !current.is_alive() {
            tracing::debug!(order = %id, status = ?current.status, "Order is no longer alive; nothing to cancel.");
            return Ok(());
        }
        self.finish(id, OrderStatus::Canceled);
        Ok(())
    }

    fn buy(&mut self, params: OrderParams) -> Result<Order> {
        self.create_order(Side::Buy, params)
    }

    fn sell(&mut self, params: OrderParams) -> Result<Order> {
        self.create_order(Side::Sell, params)
    }

    fn next(&mut self) -> Result<()> {
        self.process_cash_additions();

        let Some(now) = self.now else {
            tracing::debug!("No market snapshot yet; pending orders stay queued.");
            return Ok(());
        };

        self.accrue_interest(now);
        self.replay_order_history(now)?;
        self.process_pending(now)?;

        let value = self.total_value(None);
        self.fund.revalue(value);
        self.apply_fund_history(now);
        Ok(())
    }

    fn add_order_history(&mut self, orders: Vec<HistoricalOrder>, notify: bool) -> Result<()> {
        let mut orders = orders;
        orders.sort_by_key(|order| order.timestamp);
        self.order_history.extend(orders);
        self.notify_history = notify;
        Ok(())
    }

    fn set_fund_history(&mut self, fund: Vec<FundRecord>) -> Result<()> {
        let mut fund = fund;
        fund.sort_by_key(|record| record.timestamp);
        self.fund_history.extend(fund);
        Ok(())
    }
}

impl MarkToMarket for SimulatedBroker {
    fn mark(&mut self, snapshot: &MarketSnapshot) {
        self.now = Some(snapshot.timestamp);
        self.marks
            .extend(snapshot.prices.iter().map(|(symbol, price)| (symbol.clone(), *price)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use commission::CommissionParams;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn orcl() -> Symbol {
        Symbol::from("ORCL")
    }

    fn broker_with_cash(cash: Decimal) -> SimulatedBroker {
        SimulatedBroker::new(SimulationSettings {
            starting_cash: cash,
            ..SimulationSettings::default()
        })
    }

    /// Marks `price` for ORCL on day `d` and runs the broker step.
    fn step(broker: &mut SimulatedBroker, d: u32, price: Decimal) {
        broker.mark(&MarketSnapshot::new(day(d)).with_price(orcl(), price));
        broker.next().unwrap();
    }

    #[test]
    fn market_order_fills_at_next_step_with_commission() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.set_commission(CommissionParams::percentage(dec!(0.001)), None).unwrap();
        broker.start().unwrap();

        let order = broker.buy(OrderParams::new("test", orcl(), dec!(10))).unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(broker.cash(), Ok(dec!(10_000)));

        step(&mut broker, 1, dec!(100));
        let filled = broker.order(order.id).unwrap();
        assert_eq!(filled.status, OrderStatus::Completed);
        assert_eq!(filled.fill.as_ref().unwrap().commission, dec!(1));
        assert_eq!(broker.cash(), Ok(dec!(8_999)));
        assert_eq!(broker.value(None), Ok(dec!(9_999)));
        assert_eq!(broker.position(&orcl()), Ok(Position::new(dec!(10), dec!(100))));

        step(&mut broker, 2, dec!(110));
        assert_eq!(broker.value(None), Ok(dec!(10_099)));

        assert_eq!(broker.pop_notification().unwrap().status, OrderStatus::Accepted);
        assert_eq!(broker.pop_notification().unwrap().status, OrderStatus::Completed);
        assert!(broker.pop_notification().is_none());
    }

    #[test]
    fn value_can_be_restricted_to_symbols() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        broker.buy(OrderParams::new("test", orcl(), dec!(10))).unwrap();
        broker.buy(OrderParams::new("test", Symbol::from("NVDA"), dec!(1))).unwrap();
        broker.mark(
            &MarketSnapshot::new(day(1))
                .with_price(orcl(), dec!(100))
                .with_price(Symbol::from("NVDA"), dec!(500)),
        );
        broker.next().unwrap();

        assert_eq!(broker.value(None), Ok(dec!(10_000)));
        assert_eq!(broker.value(Some(&[orcl()][..])), Ok(dec!(9_500)));
        assert_eq!(broker.value(Some(&[][..])), Ok(dec!(8_500)));
    }

    #[test]
    fn fund_mode_tracks_shares_and_value_per_share() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.set_fund_mode(true, Some(dec!(100))).unwrap();
        broker.start().unwrap();
        assert!(broker.fund_mode());
        assert_eq!(broker.fund_shares(), Ok(dec!(100)));

        broker.buy(OrderParams::new("test", orcl(), dec!(10))).unwrap();
        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.fund_value(), Ok(dec!(100)));

        step(&mut broker, 2, dec!(110));
        assert_eq!(broker.fund_value(), Ok(dec!(101)));

        broker.add_cash(dec!(1_010));
        step(&mut broker, 3, dec!(110));
        assert_eq!(broker.fund_shares(), Ok(dec!(110)));
        assert_eq!(broker.fund_value(), Ok(dec!(101)));
        assert_eq!(broker.cash(), Ok(dec!(10_010)));
    }

    #[test]
    fn limit_order_waits_for_price() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let order = broker
            .buy(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(95)))
            .unwrap();

        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.order(order.id).unwrap().status, OrderStatus::Accepted);
        assert_eq!(broker.pending_orders().count(), 1);

        step(&mut broker, 2, dec!(94));
        let filled = broker.order(order.id).unwrap();
        assert_eq!(filled.status, OrderStatus::Completed);
        assert_eq!(filled.fill.as_ref().unwrap().price, dec!(94));
        assert_eq!(broker.pending_orders().count(), 0);
    }

    #[test]
    fn stop_order_triggers_on_breach() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let stop = broker
            .sell(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Stop).price(dec!(90)))
            .unwrap();

        step(&mut broker, 1, dec!(95));
        assert!(broker.order(stop.id).unwrap().is_alive());
        step(&mut broker, 2, dec!(89));
        assert_eq!(broker.order(stop.id).unwrap().fill.as_ref().unwrap().price, dec!(89));
    }

    #[test]
    fn trailing_stop_ratchets() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let trail = broker
            .sell(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::StopTrail)
                    .trail_amount(dec!(5)),
            )
            .unwrap();

        for (d, price) in [(1, dec!(100)), (2, dec!(110)), (3, dec!(107))] {
            step(&mut broker, d, price);
            assert!(broker.order(trail.id).unwrap().is_alive());
        }
        step(&mut broker, 4, dec!(104));
        let filled = broker.order(trail.id).unwrap();
        assert_eq!(filled.status, OrderStatus::Completed);
        assert_eq!(filled.fill.as_ref().unwrap().price, dec!(104));
    }

    #[test]
    fn one_cancels_other() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let take_profit = broker
            .sell(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(120)))
            .unwrap();
        let stop_loss = broker
            .sell(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Stop)
                    .price(dec!(90))
                    .oco(take_profit.id),
            )
            .unwrap();

        step(&mut broker, 1, dec!(121));
        assert_eq!(broker.order(take_profit.id).unwrap().status, OrderStatus::Completed);
        assert_eq!(broker.order(stop_loss.id).unwrap().status, OrderStatus::Canceled);
    }

    #[test]
    fn chained_one_cancels_other_links_share_a_group() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let first = broker
            .sell(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(200)))
            .unwrap();
        let second = broker
            .sell(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Limit)
                    .price(dec!(150))
                    .oco(first.id),
            )
            .unwrap();
        let third = broker
            .sell(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Stop)
                    .price(dec!(90))
                    .oco(second.id),
            )
            .unwrap();

        step(&mut broker, 1, dec!(80));
        assert_eq!(broker.order(third.id).unwrap().status, OrderStatus::Completed);
        assert_eq!(broker.order(second.id).unwrap().status, OrderStatus::Canceled);
        assert_eq!(broker.order(first.id).unwrap().status, OrderStatus::Canceled);
        assert_eq!(broker.pending_orders().count(), 0);
    }

    #[test]
    fn cancelling_the_middle_of_a_chain_cancels_both_ends() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let first = broker
            .buy(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(50)))
            .unwrap();
        let second = broker
            .buy(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Limit)
                    .price(dec!(40))
                    .oco(first.id),
            )
            .unwrap();
        let third = broker
            .buy(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Limit)
                    .price(dec!(30))
                    .oco(second.id),
            )
            .unwrap();
        let unrelated = broker
            .buy(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(20)))
            .unwrap();

        broker.cancel(&second).unwrap();
        assert_eq!(broker.order(first.id).unwrap().status, OrderStatus::Canceled);
        assert_eq!(broker.order(third.id).unwrap().status, OrderStatus::Canceled);
        assert!(broker.order(unrelated.id).unwrap().is_alive());
    }

    #[test]
    fn cancel_removes_pending_order_and_its_peers() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let first = broker
            .buy(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(50)))
            .unwrap();
        let second = broker
            .buy(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Limit)
                    .price(dec!(40))
                    .oco(first.id),
            )
            .unwrap();

        broker.cancel(&second).unwrap();
        assert_eq!(broker.order(first.id).unwrap().status, OrderStatus::Canceled);
        assert_eq!(broker.order(second.id).unwrap().status, OrderStatus::Canceled);
        // Cancelling twice is harmless.
        assert!(broker.cancel(&second).is_ok());

        let stranger = Order::new(OrderId(99), Side::Buy, OrderParams::new("x", orcl(), dec!(1)), None);
        assert_eq!(broker.cancel(&stranger), Err(Error::UnknownOrder(OrderId(99))));
    }

    #[test]
    fn stop_limit_waits_for_limit_after_trigger() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let order = broker
            .buy(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::StopLimit)
                    .price(dec!(105))
                    .plimit(dec!(103)),
            )
            .unwrap();

        // Triggers at 106, but the limit is not reached until the price falls back.
        for (d, price) in [(1, dec!(100)), (2, dec!(106)), (3, dec!(104))] {
            step(&mut broker, d, price);
            assert!(broker.order(order.id).unwrap().is_alive());
        }
        step(&mut broker, 4, dec!(102));
        let filled = broker.order(order.id).unwrap();
        assert_eq!(filled.status, OrderStatus::Completed);
        assert_eq!(filled.fill.as_ref().unwrap().price, dec!(102));
    }

    #[test]
    fn stop_limit_does_not_fill_below_its_trigger() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let order = broker
            .buy(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::StopLimit)
                    .price(dec!(105))
                    .plimit(dec!(103)),
            )
            .unwrap();

        // Under the limit, but the stop never triggered.
        step(&mut broker, 1, dec!(101));
        assert!(broker.order(order.id).unwrap().is_alive());
    }

    #[test]
    fn trailing_stop_by_percent() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let trail = broker
            .sell(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::StopTrail)
                    .trail_percent(dec!(0.1)),
            )
            .unwrap();

        // The stop ratchets up to 108 at a price of 120 and stays there.
        for (d, price) in [(1, dec!(100)), (2, dec!(120)), (3, dec!(110))] {
            step(&mut broker, d, price);
            assert!(broker.order(trail.id).unwrap().is_alive());
        }
        step(&mut broker, 4, dec!(107));
        let filled = broker.order(trail.id).unwrap();
        assert_eq!(filled.status, OrderStatus::Completed);
        assert_eq!(filled.fill.as_ref().unwrap().price, dec!(107));
    }

    #[test]
    fn trailing_stop_limit_fills_once_limit_is_reached() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let trail = broker
            .sell(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::StopTrailLimit)
                    .trail_amount(dec!(5))
                    .plimit(dec!(106)),
            )
            .unwrap();

        // Stop at 105 after the move to 110; triggered at 104, below the 106 limit.
        for (d, price) in [(1, dec!(100)), (2, dec!(110)), (3, dec!(104))] {
            step(&mut broker, d, price);
            assert!(broker.order(trail.id).unwrap().is_alive());
        }
        step(&mut broker, 4, dec!(107));
        let filled = broker.order(trail.id).unwrap();
        assert_eq!(filled.status, OrderStatus::Completed);
        assert_eq!(filled.fill.as_ref().unwrap().price, dec!(107));
    }

    #[test]
    fn slippage_moves_market_and_stop_fills_against_the_order() {
        let mut broker = SimulatedBroker::new(SimulationSettings {
            slippage_percent: dec!(0.01),
            ..SimulationSettings::default()
        });
        broker.start().unwrap();
        let buy = broker.buy(OrderParams::new("test", orcl(), dec!(2))).unwrap();
        let limit = broker
            .buy(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Limit).price(dec!(100)))
            .unwrap();
        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.order(buy.id).unwrap().fill.as_ref().unwrap().price, dec!(101));
        assert_eq!(broker.order(limit.id).unwrap().fill.as_ref().unwrap().price, dec!(100));
        assert_eq!(broker.cash(), Ok(dec!(9_698)));

        let stop = broker
            .sell(OrderParams::new("test", orcl(), dec!(1)).exec_type(ExecType::Stop).price(dec!(90)))
            .unwrap();
        step(&mut broker, 2, dec!(89));
        assert_eq!(broker.order(stop.id).unwrap().fill.as_ref().unwrap().price, dec!(88.11));
    }

    #[test]
    fn orders_expire_after_deadline() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let order = broker
            .buy(
                OrderParams::new("test", orcl(), dec!(1))
                    .exec_type(ExecType::Limit)
                    .price(dec!(50))
                    .valid_until(day(2)),
            )
            .unwrap();

        step(&mut broker, 1, dec!(100));
        step(&mut broker, 2, dec!(100));
        assert!(broker.order(order.id).unwrap().is_alive());
        step(&mut broker, 3, dec!(40));
        assert_eq!(broker.order(order.id).unwrap().status, OrderStatus::Expired);
    }

    #[test]
    fn insufficient_cash_yields_margin_status() {
        let mut broker = broker_with_cash(dec!(1_000));
        broker.start().unwrap();
        let order = broker.buy(OrderParams::new("test", orcl(), dec!(20))).unwrap();
        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.order(order.id).unwrap().status, OrderStatus::Margin);
        assert_eq!(broker.cash(), Ok(dec!(1_000)));
        assert!(broker.position(&orcl()).unwrap().is_flat());
    }

    #[test]
    fn futures_scheme_moves_margin_and_pnl() {
        let es = Symbol::from("ES");
        let mut broker = broker_with_cash(dec!(10_000));
        broker
            .set_commission(CommissionParams::futures(dec!(2), dec!(2000), dec!(10)), Some(es.clone()))
            .unwrap();
        broker.start().unwrap();

        broker.buy(OrderParams::new("test", es.clone(), dec!(1))).unwrap();
        broker.mark(&MarketSnapshot::new(day(1)).with_price(es.clone(), dec!(4000)));
        broker.next().unwrap();
        assert_eq!(broker.cash(), Ok(dec!(7_998)));
        assert_eq!(broker.value(None), Ok(dec!(9_998)));

        broker.mark(&MarketSnapshot::new(day(2)).with_price(es.clone(), dec!(4010)));
        broker.next().unwrap();
        assert_eq!(broker.value(None), Ok(dec!(10_098)));

        broker.sell(OrderParams::new("test", es.clone(), dec!(1))).unwrap();
        broker.next().unwrap();
        assert_eq!(broker.cash(), Ok(dec!(10_096)));
        assert_eq!(broker.value(None), Ok(dec!(10_096)));
        assert!(broker.position(&es).unwrap().is_flat());
    }

    #[test]
    fn short_positions_pay_credit_interest() {
        let mut broker = broker_with_cash(dec!(10_000));
        let params = CommissionParams { interest: dec!(0.365), ..CommissionParams::default() };
        broker.set_commission(params, None).unwrap();
        broker.start().unwrap();

        broker.sell(OrderParams::new("test", orcl(), dec!(10))).unwrap();
        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.cash(), Ok(dec!(11_000)));
        step(&mut broker, 2, dec!(100));
        assert_eq!(broker.cash(), Ok(dec!(10_999)));
    }

    #[test]
    fn order_history_is_replayed_at_its_timestamps() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker
            .add_order_history(
                vec![
                    HistoricalOrder { timestamp: day(3), symbol: orcl(), size: dec!(-5), price: dec!(120) },
                    HistoricalOrder { timestamp: day(1), symbol: orcl(), size: dec!(5), price: dec!(100) },
                ],
                false,
            )
            .unwrap();
        broker.start().unwrap();

        step(&mut broker, 1, dec!(101));
        assert_eq!(broker.cash(), Ok(dec!(9_500)));
        assert_eq!(broker.position(&orcl()), Ok(Position::new(dec!(5), dec!(100))));
        assert!(broker.pop_notification().is_none());

        step(&mut broker, 2, dec!(110));
        assert_eq!(broker.cash(), Ok(dec!(9_500)));
        step(&mut broker, 3, dec!(119));
        assert_eq!(broker.cash(), Ok(dec!(10_100)));
        assert_eq!(broker.orders().count(), 2);
    }

    #[test]
    fn notified_order_history() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker
            .add_order_history(
                vec![HistoricalOrder { timestamp: day(1), symbol: orcl(), size: dec!(1), price: dec!(100) }],
                true,
            )
            .unwrap();
        broker.start().unwrap();
        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.pop_notification().unwrap().status, OrderStatus::Accepted);
        assert_eq!(broker.pop_notification().unwrap().status, OrderStatus::Completed);
    }

    #[test]
    fn fund_history_overrides_shares_and_value() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker
            .set_fund_history(vec![FundRecord { timestamp: day(2), shares: dec!(50), value: dec!(210) }])
            .unwrap();
        broker.start().unwrap();

        step(&mut broker, 1, dec!(100));
        assert_eq!(broker.fund_shares(), Ok(dec!(100)));
        assert_eq!(broker.fund_value(), Ok(dec!(100)));

        step(&mut broker, 2, dec!(100));
        assert_eq!(broker.fund_shares(), Ok(dec!(50)));
        assert_eq!(broker.fund_value(), Ok(dec!(210)));
    }

    #[test]
    fn invalid_orders_are_rejected_up_front() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let result = broker.buy(OrderParams::new("test", orcl(), dec!(0)));
        assert!(matches!(result, Err(Error::Order(_))));
        let historical = broker.buy(
            OrderParams::new("test", orcl(), dec!(1))
                .exec_type(ExecType::Historical)
                .price(dec!(100)),
        );
        assert!(matches!(historical, Err(Error::Order(_))));
        assert_eq!(broker.orders().count(), 0);
    }

    #[test]
    fn orders_wait_for_a_price() {
        let mut broker = broker_with_cash(dec!(10_000));
        broker.start().unwrap();
        let order = broker.buy(OrderParams::new("test", orcl(), dec!(1))).unwrap();
        broker.next().unwrap();
        broker.mark(&MarketSnapshot::new(day(1)).with_price(Symbol::from("NVDA"), dec!(10)));
        broker.next().unwrap();
        assert!(broker.order(order.id).unwrap().is_alive());
    }
}
