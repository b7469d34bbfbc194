//! Market data arriving from the exchange feed.
//!
//! # Price encoding
//!
//! Exchange feeds send prices as decimal strings (`"50000.01"`) to avoid float
//! rounding on the wire; replayed or synthetic trades often use plain numbers.
//! Both are accepted and held as `f64`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::json_util::de_price;

/// Payload of [`crate::events::TRADE`]: a trade wrapped with its exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub exchange: String,
    pub trade: Trade,
}

/// A single trade print.
///
/// Only the fields the recipe reads are modeled; the feed's other fields
/// (`side`, `size`, `trade_id`, ...) are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(deserialize_with = "de_price")]
    pub price: f64,
    /// Trading pair, e.g. `"BTC-USD"`.
    pub product_id: String,
    pub time: DateTime<Utc>,
}

impl TradeEvent {
    pub fn new(
        exchange: impl Into<String>,
        price: f64,
        product_id: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            trade: Trade { price, product_id: product_id.into(), time },
        }
    }
}
