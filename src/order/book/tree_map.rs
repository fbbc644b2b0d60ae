//! Order book implementation backed by BTreeMap price levels.
//!
//! This module provides a price-time priority limit order book using two
//! BTreeMaps (one for bids, one for asks) keyed by price. Each price level
//! maintains a FIFO queue of orders via indices into a Slab, allowing O(1)
//! insertion/removal within a level. Sequence numbers only grow, so pushing
//! to the back of a level keeps it sorted by sequence; this holds for iceberg
//! slices re-entering the book after replenishment as well.
//!
//! Matching runs inside [`Book::add`]: the incoming order is inserted first,
//! then crossed against the best opposite order until it is exhausted or the
//! prices no longer overlap.

use crate::order::book::{Book, Error, SimpleOrder, Snapshot, crosses};
use crate::order::{Id, Identity, Order, Price, Side, Volume};
use crate::seq::Clock;
use crate::trade::Trade;
use slab::Slab;
use std::cmp;
use std::collections::{BTreeMap, HashMap};
use std::iter;
use tracing::{debug, trace};

/// Aggregated state for a single price level.
///
/// Keeps the head/tail of a doubly-linked list of orders (by slab index) and
/// the order count.
#[derive(Debug, Default)]
struct PriceLevel {
    head: Option<usize>,
    tail: Option<usize>,
    total_orders: usize,
}

impl PriceLevel {
    /// Append an order node to the back of the level's FIFO queue and update
    /// aggregates. The `order_idx` must reference a valid entry in `orders`.
    fn push(&mut self, orders: &mut Slab<OrderNode>, order_idx: usize) {
        match self.tail {
            Some(tail) => {
                orders[tail].next = Some(order_idx);
                orders[order_idx].prev = Some(tail);
                self.tail = Some(order_idx);
            }
            None => {
                self.head = Some(order_idx);
                self.tail = Some(order_idx);
                orders[order_idx].prev = None;
            }
        }

        self.total_orders += 1;
    }

    /// Remove a specific order node from the level's queue and update
    /// aggregates. The node must be currently linked in this level.
    fn remove(&mut self, orders: &mut Slab<OrderNode>, order_idx: usize) {
        let prev = orders[order_idx].prev;
        let next = orders[order_idx].next;

        if let Some(p) = prev {
            orders[p].next = next;
        } else {
            self.head = next;
        }
        if let Some(n) = next {
            orders[n].prev = prev;
        } else {
            self.tail = prev;
        }
        self.total_orders -= 1;
        orders[order_idx].prev = None;
        orders[order_idx].next = None;
    }
}

/// Node representing an individual order stored in a slab and linked within a
/// price level's FIFO queue.
#[derive(Debug)]
struct OrderNode {
    order: Order,
    next: Option<usize>,
    prev: Option<usize>,
}

/// BTreeMap-backed order book implementing price-time priority.
#[derive(Debug, Default)]
pub struct TreeMap {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: Slab<OrderNode>,
    order_indexes: HashMap<Id, usize>,
    clock: Clock,
}

impl TreeMap {
    /// Create a new, empty TreeMap order book.
    pub fn new() -> Self {
        TreeMap::default()
    }

    /// Lookup a live order by id.
    pub fn lookup(&self, id: Id) -> Option<&Order> {
        self.order_indexes
            .get(&id)
            .map(|idx| &self.orders[*idx].order)
    }

    fn levels_mut(
        &mut self,
        side: Side,
    ) -> (&mut BTreeMap<Price, PriceLevel>, &mut Slab<OrderNode>) {
        match side {
            Side::Bid => (&mut self.bids, &mut self.orders),
            Side::Ask => (&mut self.asks, &mut self.orders),
        }
    }

    /// Store `order` and link it at the back of its price level.
    fn insert(&mut self, order: Order) -> usize {
        let (id, side, price) = (order.id(), order.side(), order.price());
        let idx = self.orders.insert(OrderNode {
            order,
            next: None,
            prev: None,
        });
        self.order_indexes.insert(id, idx);

        let (levels, orders) = self.levels_mut(side);
        let level = levels.entry(price).or_default();
        debug_assert!(
            level
                .tail
                .is_none_or(|tail| orders[tail].order.priority() < orders[idx].order.priority())
        );
        level.push(orders, idx);

        idx
    }

    /// Remove an order (by slab index) from its price level and delete it
    /// from the book, cleaning up an emptied price level.
    fn remove(&mut self, idx: usize) -> Order {
        let (side, price) = (self.orders[idx].order.side(), self.orders[idx].order.price());
        let (levels, orders) = self.levels_mut(side);
        if let Some(level) = levels.get_mut(&price) {
            level.remove(orders, idx);
            if level.total_orders == 0 {
                levels.remove(&price);
            }
        }

        let node = self.orders.remove(idx);
        self.order_indexes.remove(&node.order.id());
        node.order
    }

    /// Take `volume` off the visible slice of the order at `idx`.
    fn fill(&mut self, idx: usize, volume: Volume) {
        self.orders[idx].order.fill(volume);
    }

    /// Deal with an order whose visible slice may have run out.
    ///
    /// Orders with visible volume left are untouched. An exhausted order is
    /// removed; if it still hides volume, its next slice re-enters the back of
    /// the same level with a fresh sequence. Returns the slab index of the
    /// order if it is still live.
    fn refresh(&mut self, idx: usize) -> Option<usize> {
        if self.orders[idx].order.visible_volume() > 0 {
            return Some(idx);
        }

        let order = self.remove(idx);
        if order.hidden_volume() == 0 {
            trace!(id = order.id(), "order fully executed");
            return None;
        }

        let seq = self.clock.tick();
        let next = order.replenished(seq)?;
        debug!(
            id = next.id(),
            seq,
            visible = next.visible_volume(),
            hidden = next.hidden_volume(),
            "replenished iceberg slice"
        );

        Some(self.insert(next))
    }

    /// Slab index of the best order on `side`.
    fn best(&self, side: Side) -> Option<usize> {
        match side {
            Side::Bid => self.bids.last_key_value(),
            Side::Ask => self.asks.first_key_value(),
        }
        .and_then(|(_, level)| level.head)
    }

    /// Orders of a level from head to tail.
    fn level_orders<'a>(&'a self, level: &'a PriceLevel) -> impl Iterator<Item = &'a Order> {
        iter::successors(level.head, move |idx| self.orders[*idx].next)
            .map(move |idx| &self.orders[idx].order)
    }
}

impl Book for TreeMap {
    /// Insert a new order and cross it against the opposite side while the
    /// prices overlap. Trades are priced at the resting order's price.
    fn add(&mut self, order: Order, mut trades: Option<&mut Vec<Trade>>) -> Result<(), Error> {
        if let Some(&idx) = self.order_indexes.get(&order.id()) {
            return Err(match self.orders[idx].order.identity(&order) {
                Identity::Conflict => Error::IdentityConflict(order.id()),
                _ => Error::OrderExists(order.id()),
            });
        }

        let side = order.side();
        let seq = self.clock.tick();
        let mut incoming = self.insert(order.with_seq(seq));

        while let Some(resting) = self.best(side.opposite()) {
            let (incoming_id, incoming_price, incoming_volume) = {
                let o = &self.orders[incoming].order;
                (o.id(), o.price(), o.visible_volume())
            };
            let (resting_id, resting_price, resting_volume) = {
                let o = &self.orders[resting].order;
                (o.id(), o.price(), o.visible_volume())
            };

            if !crosses(side, incoming_price, resting_price) {
                break;
            }

            let volume = cmp::min(incoming_volume, resting_volume);
            self.fill(resting, volume);
            self.fill(incoming, volume);
            self.refresh(resting);

            let (buy_order_id, sell_order_id) = match side {
                Side::Bid => (incoming_id, resting_id),
                Side::Ask => (resting_id, incoming_id),
            };
            debug!(
                buy_order_id,
                sell_order_id,
                price = resting_price,
                volume,
                "executed trade"
            );
            if let Some(trades) = trades.as_deref_mut() {
                trades.push(Trade {
                    buy_order_id,
                    sell_order_id,
                    price: resting_price,
                    volume,
                });
            }

            match self.refresh(incoming) {
                Some(idx) => incoming = idx,
                None => break,
            }
        }

        Ok(())
    }

    /// Cancel the live order sharing the identity of `order`.
    fn cancel(&mut self, order: &Order) -> Result<Order, Error> {
        let idx = *self
            .order_indexes
            .get(&order.id())
            .ok_or(Error::OrderNotFound(order.id()))?;

        match self.orders[idx].order.identity(order) {
            Identity::Same => Ok(self.remove(idx)),
            Identity::Conflict => Err(Error::IdentityConflict(order.id())),
            Identity::Distinct => Err(Error::OrderNotFound(order.id())),
        }
    }

    /// Return every resting order, best first on each side.
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            bids: self
                .bids
                .values()
                .rev()
                .flat_map(|level| self.level_orders(level))
                .map(SimpleOrder::from)
                .collect(),
            asks: self
                .asks
                .values()
                .flat_map(|level| self.level_orders(level))
                .map(SimpleOrder::from)
                .collect(),
        }
    }

    fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    fn len(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(id: Id, side: Side, price: Price, volume: Volume) -> Order {
        Order::limit(id, side, price, volume).unwrap()
    }

    fn iceberg(id: Id, side: Side, price: Price, volume: Volume, peak: Volume) -> Order {
        Order::iceberg(id, side, price, volume, peak).unwrap()
    }

    fn add(book: &mut TreeMap, order: Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        book.add(order, Some(&mut trades)).unwrap();
        trades
    }

    fn so(id: Id, price: Price, volume: Volume) -> SimpleOrder {
        SimpleOrder { id, price, volume }
    }

    fn trade(buy: Id, sell: Id, price: Price, volume: Volume) -> Trade {
        Trade {
            buy_order_id: buy,
            sell_order_id: sell,
            price,
            volume,
        }
    }

    #[test]
    fn non_crossing_orders_rest_in_priority_order() {
        let mut book = TreeMap::new();
        assert!(add(&mut book, limit(1, Side::Bid, 100, 10)).is_empty());
        assert!(add(&mut book, limit(2, Side::Bid, 101, 5)).is_empty());
        assert!(add(&mut book, limit(3, Side::Bid, 100, 7)).is_empty());
        assert!(add(&mut book, limit(4, Side::Ask, 110, 2)).is_empty());
        assert!(add(&mut book, limit(5, Side::Ask, 105, 4)).is_empty());

        let snapshot = book.snapshot();
        assert_eq!(snapshot.bids, vec![so(2, 101, 5), so(1, 100, 10), so(3, 100, 7)]);
        assert_eq!(snapshot.asks, vec![so(5, 105, 4), so(4, 110, 2)]);
        assert_eq!(book.best_bid(), Some(101));
        assert_eq!(book.best_ask(), Some(105));
        assert_eq!(book.len(), 5);
    }

    #[test]
    fn crossing_limit_trades_at_resting_price() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Bid, 100, 100));
        let trades = add(&mut book, limit(2, Side::Ask, 80, 50));

        assert_eq!(trades, vec![trade(1, 2, 100, 50)]);
        let snapshot = book.snapshot();
        assert_eq!(snapshot.bids, vec![so(1, 100, 50)]);
        assert!(snapshot.asks.is_empty());

        // A sell above the bid rests without trading.
        assert!(add(&mut book, limit(3, Side::Ask, 120, 40)).is_empty());
        assert_eq!(book.snapshot().asks, vec![so(3, 120, 40)]);
    }

    #[test]
    fn incoming_bid_sweeps_levels_best_first() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Ask, 102, 30));
        add(&mut book, limit(2, Side::Ask, 100, 30));
        add(&mut book, limit(3, Side::Ask, 101, 30));
        add(&mut book, limit(4, Side::Ask, 103, 30));

        let trades = add(&mut book, limit(5, Side::Bid, 102, 80));
        assert_eq!(
            trades,
            vec![
                trade(5, 2, 100, 30),
                trade(5, 3, 101, 30),
                trade(5, 1, 102, 20)
            ]
        );

        let snapshot = book.snapshot();
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.asks, vec![so(1, 102, 10), so(4, 103, 30)]);
        assert_eq!(book.best_ask(), Some(102));
    }

    #[test]
    fn incoming_ask_rests_remainder_after_price_gap() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Bid, 100, 10));
        add(&mut book, limit(2, Side::Bid, 95, 10));

        let trades = add(&mut book, limit(3, Side::Ask, 98, 25));
        assert_eq!(trades, vec![trade(1, 3, 100, 10)]);

        let snapshot = book.snapshot();
        assert_eq!(snapshot.bids, vec![so(2, 95, 10)]);
        assert_eq!(snapshot.asks, vec![so(3, 98, 15)]);
    }

    #[test]
    fn equal_prices_match_in_arrival_order() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Ask, 100, 10));
        add(&mut book, limit(2, Side::Ask, 100, 10));

        let trades = add(&mut book, limit(3, Side::Bid, 100, 15));
        assert_eq!(trades, vec![trade(3, 1, 100, 10), trade(3, 2, 100, 5)]);
        assert_eq!(book.snapshot().asks, vec![so(2, 100, 5)]);
    }

    #[test]
    fn icebergs_replenish_and_requeue() {
        let mut book = TreeMap::new();
        assert!(add(&mut book, iceberg(1, Side::Ask, 100, 200, 100)).is_empty());
        assert!(add(&mut book, iceberg(2, Side::Ask, 100, 300, 100)).is_empty());
        assert!(add(&mut book, iceberg(3, Side::Ask, 100, 200, 100)).is_empty());
        assert_eq!(
            book.snapshot().asks,
            vec![so(1, 100, 100), so(2, 100, 100), so(3, 100, 100)]
        );

        let trades = add(&mut book, iceberg(4, Side::Bid, 100, 500, 100));
        assert_eq!(
            trades,
            vec![
                trade(4, 1, 100, 100),
                trade(4, 2, 100, 100),
                trade(4, 3, 100, 100),
                trade(4, 1, 100, 100),
                trade(4, 2, 100, 100),
            ]
        );

        let snapshot = book.snapshot();
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.asks, vec![so(3, 100, 100), so(2, 100, 100)]);

        let third = book.lookup(3).unwrap();
        assert_eq!(third.hidden_volume(), 0);
        assert_eq!(third.seq(), 9);
        let second = book.lookup(2).unwrap();
        assert_eq!(second.hidden_volume(), 0);
        assert_eq!(second.seq(), 12);
        assert!(book.lookup(1).is_none());
        assert!(book.lookup(4).is_none());
    }

    #[test]
    fn replenished_iceberg_loses_time_priority() {
        let mut book = TreeMap::new();
        add(&mut book, iceberg(1, Side::Ask, 100, 200, 100));
        add(&mut book, limit(2, Side::Ask, 100, 50));

        // Exhausts the first slice of 1, which re-enters behind 2.
        let trades = add(&mut book, limit(3, Side::Bid, 100, 100));
        assert_eq!(trades, vec![trade(3, 1, 100, 100)]);
        assert_eq!(book.snapshot().asks, vec![so(2, 100, 50), so(1, 100, 100)]);

        let trades = add(&mut book, limit(4, Side::Bid, 100, 60));
        assert_eq!(trades, vec![trade(4, 2, 100, 50), trade(4, 1, 100, 10)]);
        assert_eq!(book.snapshot().asks, vec![so(1, 100, 90)]);
    }

    #[test]
    fn incoming_iceberg_rests_only_its_visible_slice() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Ask, 100, 30));

        let trades = add(&mut book, iceberg(2, Side::Bid, 100, 100, 20));
        assert_eq!(trades, vec![trade(2, 1, 100, 20), trade(2, 1, 100, 10)]);

        let resting = book.lookup(2).unwrap();
        assert_eq!(resting.visible_volume(), 10);
        assert_eq!(resting.hidden_volume(), 60);
        assert_eq!(book.snapshot().bids, vec![so(2, 100, 10)]);
    }

    #[test]
    fn trades_are_not_collected_without_a_log() {
        let mut book = TreeMap::new();
        book.add(limit(1, Side::Bid, 100, 10), None).unwrap();
        book.add(limit(2, Side::Ask, 100, 10), None).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn cancel_removes_order_once() {
        let mut book = TreeMap::new();
        let order = limit(1, Side::Bid, 100, 100);
        add(&mut book, order.clone());

        let canceled = book.cancel(&order).unwrap();
        assert_eq!(canceled.id(), 1);
        assert_eq!(book.snapshot(), Snapshot::default());
        assert_eq!(book.best_bid(), None);

        assert_eq!(book.cancel(&order).unwrap_err(), Error::OrderNotFound(1));
    }

    #[test]
    fn cancel_finds_partially_filled_iceberg() {
        let mut book = TreeMap::new();
        let order = iceberg(1, Side::Ask, 100, 300, 100);
        add(&mut book, order.clone());
        add(&mut book, limit(2, Side::Bid, 100, 150));

        let canceled = book.cancel(&order).unwrap();
        assert_eq!(canceled.remaining_volume(), 150);
        assert!(book.is_empty());
    }

    #[test]
    fn partial_fills_leave_level_queue_intact() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Ask, 100, 50));
        add(&mut book, limit(2, Side::Ask, 100, 50));
        add(&mut book, limit(3, Side::Ask, 101, 50));

        let trades = add(&mut book, limit(4, Side::Bid, 100, 70));
        assert_eq!(trades, vec![trade(4, 1, 100, 50), trade(4, 2, 100, 20)]);
        assert_eq!(book.snapshot().asks, vec![so(2, 100, 30), so(3, 101, 50)]);

        let trades = add(&mut book, limit(5, Side::Bid, 101, 80));
        assert_eq!(trades, vec![trade(5, 2, 100, 30), trade(5, 3, 101, 50)]);
        assert_eq!(book.snapshot(), Snapshot::default());
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn cancel_does_not_consume_sequence_numbers() {
        let mut book = TreeMap::new();
        let order = limit(1, Side::Bid, 100, 10);
        add(&mut book, order.clone());
        book.cancel(&order).unwrap();

        add(&mut book, limit(2, Side::Bid, 100, 10));
        assert_eq!(book.lookup(2).unwrap().seq(), 2);
    }

    #[test]
    fn cancel_with_conflicting_fields_fails() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Bid, 100, 100));

        let conflicting = limit(1, Side::Bid, 200, 100);
        assert_eq!(
            book.cancel(&conflicting).unwrap_err(),
            Error::IdentityConflict(1)
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected_without_side_effects() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Bid, 100, 100));

        assert_eq!(
            book.add(limit(1, Side::Bid, 100, 100), None).unwrap_err(),
            Error::OrderExists(1)
        );
        assert_eq!(
            book.add(limit(1, Side::Ask, 90, 100), None).unwrap_err(),
            Error::IdentityConflict(1)
        );
        assert_eq!(book.snapshot().bids, vec![so(1, 100, 100)]);
        assert!(book.snapshot().asks.is_empty());

        // Rejected adds do not consume sequence numbers.
        add(&mut book, limit(2, Side::Bid, 99, 1));
        assert_eq!(book.lookup(2).unwrap().seq(), 2);
    }

    #[test]
    fn filled_ids_can_be_reused() {
        let mut book = TreeMap::new();
        add(&mut book, limit(1, Side::Bid, 100, 10));
        add(&mut book, limit(2, Side::Ask, 100, 10));
        assert!(book.is_empty());

        assert!(add(&mut book, limit(1, Side::Ask, 105, 10)).is_empty());
        assert_eq!(book.snapshot().asks, vec![so(1, 105, 10)]);
    }
}
