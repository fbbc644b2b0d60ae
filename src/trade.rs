use crate::order;
use serde::Serialize;

/// One execution between a bid and an ask. The price is always the price of
/// the order that was resting in the book.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub buy_order_id: order::Id,
    pub sell_order_id: order::Id,
    pub price: order::Price,
    #[serde(rename = "quantity")]
    pub volume: order::Volume,
}
