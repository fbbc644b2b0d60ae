//! The order entity.
//!
//! An [`Order`] is validated once, at construction, and is only ever changed
//! by the book through fills and iceberg replenishment. Ranking within one
//! side of the book goes through [`Priority`]; identity checks between two
//! orders sharing an id go through [`Order::identity`].

use crate::seq::Seq;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Limit,
    Iceberg,
}

pub type Id = u64;
pub type Price = u64; // ticks
pub type Volume = u64;

/// Errors raised while building an order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

/// Result of comparing two orders by identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The orders have different ids.
    Distinct,
    /// Same id and same fields.
    Same,
    /// Same id but different fields; the input data is inconsistent.
    Conflict,
}

#[derive(Debug, Clone)]
pub struct Order {
    id: Id,
    side: Side,
    kind: Kind,
    price: Price,
    /// Total volume the order was created with (visible + hidden).
    volume: Volume,
    peak: Volume,
    visible_volume: Volume,
    hidden_volume: Volume,
    seq: Seq,
}

impl Order {
    /// Build and validate an order from its raw fields.
    ///
    /// `volume` is the total volume; for icebergs it is split into a visible
    /// slice of at most `peak` and a hidden reserve.
    pub fn new(
        id: Id,
        kind: Kind,
        side: Side,
        price: Price,
        volume: Volume,
        peak: Volume,
    ) -> Result<Self, Error> {
        match kind {
            Kind::Limit if peak > 0 => {
                return Err(Error::InvariantViolation(
                    "limit orders can't have a positive peak",
                ));
            }
            Kind::Iceberg if peak == 0 => {
                return Err(Error::InvariantViolation(
                    "iceberg orders must have a positive peak",
                ));
            }
            _ => {}
        }

        let (visible_volume, hidden_volume) = match kind {
            Kind::Limit => (volume, 0),
            Kind::Iceberg => (volume.min(peak), volume.saturating_sub(peak)),
        };

        if price == 0 {
            return Err(Error::InvariantViolation("price must be positive"));
        }
        if visible_volume == 0 {
            return Err(Error::InvariantViolation("volume must be positive"));
        }

        Ok(Order {
            id,
            side,
            kind,
            price,
            volume,
            peak,
            visible_volume,
            hidden_volume,
            seq: 0,
        })
    }

    pub fn limit(id: Id, side: Side, price: Price, volume: Volume) -> Result<Self, Error> {
        Order::new(id, Kind::Limit, side, price, volume, 0)
    }

    pub fn iceberg(
        id: Id,
        side: Side,
        price: Price,
        volume: Volume,
        peak: Volume,
    ) -> Result<Self, Error> {
        Order::new(id, Kind::Iceberg, side, price, volume, peak)
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn peak(&self) -> Volume {
        self.peak
    }

    /// Volume currently eligible to trade.
    pub fn visible_volume(&self) -> Volume {
        self.visible_volume
    }

    /// Iceberg reserve. Never part of any rendered view of the order.
    pub fn hidden_volume(&self) -> Volume {
        self.hidden_volume
    }

    /// Sequence assigned by the book, 0 until the order is inserted.
    pub fn seq(&self) -> Seq {
        self.seq
    }

    /// Visible plus hidden volume still open.
    pub fn remaining_volume(&self) -> Volume {
        self.visible_volume + self.hidden_volume
    }

    pub fn priority(&self) -> Priority {
        Priority {
            side: self.side,
            price: self.price,
            seq: self.seq,
        }
    }

    /// Compare identities. Two orders sharing an id must agree on every
    /// field given at construction, otherwise the result is a conflict.
    pub fn identity(&self, other: &Order) -> Identity {
        if self.id != other.id {
            return Identity::Distinct;
        }

        let same = self.side == other.side
            && self.kind == other.kind
            && self.price == other.price
            && self.volume == other.volume
            && self.peak == other.peak;
        if same {
            Identity::Same
        } else {
            Identity::Conflict
        }
    }

    pub(crate) fn with_seq(mut self, seq: Seq) -> Self {
        self.seq = seq;
        self
    }

    /// Take `volume` off the visible slice. Callers never fill more than is
    /// visible.
    pub(crate) fn fill(&mut self, volume: Volume) {
        debug_assert!(volume <= self.visible_volume);
        self.visible_volume -= volume;
    }

    /// Build the next slice of an exhausted iceberg, or `None` when nothing
    /// is hidden anymore.
    pub(crate) fn replenished(self, seq: Seq) -> Option<Self> {
        debug_assert_eq!(self.visible_volume, 0);
        if self.hidden_volume == 0 {
            return None;
        }

        let slice = self.peak.min(self.hidden_volume);
        Some(Order {
            visible_volume: self.visible_volume + slice,
            hidden_volume: self.hidden_volume - slice,
            seq,
            ..self
        })
    }
}

/// Ranking key of an order within one side of the book.
///
/// A smaller key ranks better: bids by descending price, asks by ascending
/// price, then by ascending sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Priority {
    side: Side,
    price: Price,
    seq: Seq,
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.side, other.side);
        let by_price = match self.side {
            Side::Bid => other.price.cmp(&self.price),
            Side::Ask => self.price.cmp(&other.price),
        };

        by_price.then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub mod book;
pub mod wire;
