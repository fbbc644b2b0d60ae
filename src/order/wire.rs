//! JSON wire format for orders.
//!
//! Orders travel as `{"type": ..., "order": {...}}` objects, one per line in
//! interactive sessions and as a JSON array in batch files. The public
//! [`Order`] type is never (de)serialized directly: decoding goes through the
//! explicit [`WireOrder`] schema, which keeps every field optional so that a
//! missing field surfaces as [`order::Error::MissingField`] instead of an
//! opaque parser message, and the remaining checks are the ones of
//! [`Order::new`].
//!
//! Encoding an order renders its "detailed" view: the visible volume as
//! `quantity`, and `peak` only for icebergs. Hidden volume is never written.

use crate::order::{self, Id, Kind, Order, Price, Volume};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Wire-level order kind, carried in the `type` tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Limit,
    Iceberg,
}

impl From<Kind> for Type {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Limit => Type::Limit,
            Kind::Iceberg => Type::Iceberg,
        }
    }
}

impl From<Type> for Kind {
    fn from(value: Type) -> Self {
        match value {
            Type::Limit => Kind::Limit,
            Type::Iceberg => Kind::Iceberg,
        }
    }
}

/// Wire-level order side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl From<order::Side> for Direction {
    fn from(s: order::Side) -> Self {
        match s {
            order::Side::Bid => Direction::Buy,
            order::Side::Ask => Direction::Sell,
        }
    }
}

impl From<Direction> for order::Side {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Buy => order::Side::Bid,
            Direction::Sell => order::Side::Ask,
        }
    }
}

/// Order fields nested under the `order` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Total volume on input; visible volume when rendering a live order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Volume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<Volume>,
}

/// One order in wire form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOrder {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderBody>,
}

impl WireOrder {
    /// Wire form of a new order with the given total volume.
    pub fn new(
        id: Id,
        kind: Kind,
        side: order::Side,
        price: Price,
        volume: Volume,
        peak: Volume,
    ) -> Self {
        WireOrder {
            kind: Some(kind.into()),
            order: Some(OrderBody {
                direction: Some(side.into()),
                id: Some(id),
                price: Some(price),
                quantity: Some(volume),
                peak: (peak > 0).then_some(peak),
            }),
        }
    }
}

/// Detailed view of a live order.
impl From<&Order> for WireOrder {
    fn from(o: &Order) -> Self {
        WireOrder::new(
            o.id(),
            o.kind(),
            o.side(),
            o.price(),
            o.visible_volume(),
            o.peak(),
        )
    }
}

impl TryFrom<WireOrder> for Order {
    type Error = order::Error;

    fn try_from(w: WireOrder) -> Result<Self, Self::Error> {
        let kind = w.kind.ok_or(order::Error::MissingField("type"))?;
        let body = w.order.ok_or(order::Error::MissingField("order"))?;
        let side = body
            .direction
            .ok_or(order::Error::MissingField("direction"))?;
        let id = body.id.ok_or(order::Error::MissingField("id"))?;
        let price = body.price.ok_or(order::Error::MissingField("price"))?;
        let volume = body
            .quantity
            .ok_or(order::Error::MissingField("quantity"))?;

        Order::new(
            id,
            kind.into(),
            side.into(),
            price,
            volume,
            body.peak.unwrap_or(0),
        )
    }
}

/// Errors returned by encoding/decoding operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to Encode/Decode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to Read/Write: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid order: {0}")]
    Order(#[from] order::Error),
}

/// Decode a single JSON order line into a validated order.
pub fn decode_order(line: &str) -> Result<Order, Error> {
    let wire: WireOrder = serde_json::from_str(line)?;
    Ok(Order::try_from(wire)?)
}

/// Render the detailed view of a live order as a JSON line.
pub fn encode_order(order: &Order) -> Result<String, Error> {
    Ok(serde_json::to_string(&WireOrder::from(order))?)
}

/// Decode a batch of orders from a JSON array.
///
/// Only a payload that is not a JSON array fails the whole batch. Every
/// element is decoded on its own, so callers can skip the bad ones and keep
/// the rest.
pub fn decode_orders_batch(bytes: &[u8]) -> Result<Vec<Result<Order, Error>>, Error> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    Ok(values.into_iter().map(decode_value).collect())
}

fn decode_value(value: serde_json::Value) -> Result<Order, Error> {
    let wire: WireOrder = serde_json::from_value(value)?;
    Ok(Order::try_from(wire)?)
}

/// Encode a batch of wire orders as a pretty-printed JSON array.
pub fn encode_orders_batch(orders: &[WireOrder]) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec_pretty(orders)?)
}

/// Read a batch file produced by [`save_orders_batch`] or written by hand.
pub fn load_orders_batch(path: &Path) -> Result<Vec<Result<Order, Error>>, Error> {
    let values: Vec<serde_json::Value> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(values.into_iter().map(decode_value).collect())
}

/// Write a batch of wire orders to `path`, replacing any existing file.
pub fn save_orders_batch(path: &Path, orders: &[WireOrder]) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, orders)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
