use crate::order::Order;
use crate::order::book::tree_map::TreeMap;
use crate::order::book::{Book, Error, Snapshot};
use crate::order::Price;
use crate::trade::Trade;
use tracing::{debug, warn};

/// A thin orchestrator over an order book that:
/// - forwards add/cancel operations to the underlying book,
/// - keeps the trades executed by the most recent add when recording is on,
/// - and renders snapshots of the resting orders.
///
/// The matcher owns all of its state; two matchers never share a book, a
/// clock or a trade log.
pub struct Matcher<T: Book = TreeMap> {
    book: T,
    record_trades: bool,
    last_trades: Vec<Trade>,
}

impl Matcher<TreeMap> {
    /// Create a matcher over an empty [`TreeMap`] book.
    pub fn with_tree_map(record_trades: bool) -> Self {
        Matcher::new(TreeMap::new(), record_trades)
    }
}

impl<T: Book> Matcher<T> {
    /// Create a new matcher around the given book.
    pub fn new(book: T, record_trades: bool) -> Self {
        Self {
            book,
            record_trades,
            last_trades: Vec::new(),
        }
    }

    /// Add an order and execute all crossing trades before returning.
    ///
    /// The trade log is cleared first, so after the call it holds exactly the
    /// trades of this order (and stays empty when recording is off).
    pub fn add(&mut self, order: Order) -> Result<(), Error> {
        self.last_trades.clear();
        let id = order.id();
        let trades = self.record_trades.then_some(&mut self.last_trades);

        match self.book.add(order, trades) {
            Ok(()) => {
                debug!(id, trades = self.last_trades.len(), "order added");
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "order rejected");
                Err(e)
            }
        }
    }

    /// Cancel a resting order, returning it as it was in the book.
    pub fn cancel(&mut self, order: &Order) -> Result<Order, Error> {
        let canceled = self.book.cancel(order)?;
        debug!(id = canceled.id(), "order canceled");
        Ok(canceled)
    }

    /// Snapshot of resting orders, best first on each side.
    pub fn get_state(&self) -> Snapshot {
        self.book.snapshot()
    }

    /// Trades executed by the most recent [`Matcher::add`].
    pub fn last_trades(&self) -> &[Trade] {
        &self.last_trades
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    pub fn len(&self) -> usize {
        self.book.len()
    }

    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }

    pub fn book(&self) -> &T {
        &self.book
    }
}
