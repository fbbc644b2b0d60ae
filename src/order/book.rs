//! Order book traits and shared types.
//!
//! This module defines the interface expected from an order book
//! implementation, the crossing rule shared by implementations, and the
//! snapshot types used to render the resting orders of both sides.

pub mod tree_map;

use crate::order::{Id, Order, Price, Side, Volume};
use crate::trade::Trade;
use serde::Serialize;
use thiserror::Error;

/// A resting order as shown in book snapshots. `volume` is the visible
/// volume only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleOrder {
    pub id: Id,
    pub price: Price,
    #[serde(rename = "quantity")]
    pub volume: Volume,
}

impl From<&Order> for SimpleOrder {
    fn from(order: &Order) -> Self {
        SimpleOrder {
            id: order.id(),
            price: order.price(),
            volume: order.visible_volume(),
        }
    }
}

/// Resting orders of both sides, each in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Bids, best first.
    #[serde(rename = "buyOrders")]
    pub bids: Vec<SimpleOrder>,
    /// Asks, best first.
    #[serde(rename = "sellOrders")]
    pub asks: Vec<SimpleOrder>,
}

/// Generic order-book errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Tried to operate on an order that does not exist.
    #[error("order {0} not found")]
    OrderNotFound(Id),
    /// Tried to add an order whose id is already resting in the book.
    #[error("order {0} already exists")]
    OrderExists(Id),
    /// Two different orders share the same id.
    #[error("different orders share the id {0}")]
    IdentityConflict(Id),
}

/// Whether a resting order at `resting_price` can trade with an incoming
/// order of side `incoming` priced at `incoming_price`.
///
/// Equal prices always cross.
pub fn crosses(incoming: Side, incoming_price: Price, resting_price: Price) -> bool {
    match incoming {
        Side::Bid => resting_price <= incoming_price,
        Side::Ask => resting_price >= incoming_price,
    }
}

/// The core order book interface. Implementors provide insertion with
/// immediate matching, cancellation and a snapshot of resting orders.
pub trait Book {
    /// Insert `order` and execute every possible trade before returning.
    ///
    /// Executed trades are appended to `trades` when it is given. Returns an
    /// error, without touching the book, if the order id is already live.
    fn add(&mut self, order: Order, trades: Option<&mut Vec<Trade>>) -> Result<(), Error>;
    /// Remove the live order with the identity of `order`, returning it.
    fn cancel(&mut self, order: &Order) -> Result<Order, Error>;
    /// Resting orders of both sides in priority order.
    fn snapshot(&self) -> Snapshot;
    /// Best bid price, if any bid rests.
    fn best_bid(&self) -> Option<Price>;
    /// Best ask price, if any ask rests.
    fn best_ask(&self) -> Option<Price>;
    /// Number of live orders on both sides.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
