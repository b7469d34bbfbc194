//! In-memory all-time-high tracking, keyed by exchange.
//!
//! For each exchange the highest price seen so far is stored. A trade is a new
//! high only if its price is strictly greater than the stored value; an
//! exchange with no stored value behaves as if its high were negative
//! infinity, so its first trade with a finite price always qualifies.
//!
//! The store itself never persists anything and never re-checks on write:
//! [`HighStore::set_high`] is only called after [`HighStore::is_all_time_high`]
//! accepted the price, which keeps each exchange's high non-decreasing.
//!
//! # Thread safety
//!
//! Not thread-safe. The recipe shares one instance behind a mutex.

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashMap;
use ath_core::types::{HighRecord, TradeEvent};

/// Per-exchange all-time highs.
#[derive(Debug, Default)]
pub struct HighStore {
    highs: AHashMap<String, f64>,
}

impl HighStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the trade's price beats the stored high for its exchange.
    ///
    /// A non-finite price never qualifies.
    #[inline]
    pub fn is_all_time_high(&self, event: &TradeEvent) -> bool {
        let price = event.trade.price;
        let current = self.high(&event.exchange).unwrap_or(f64::NEG_INFINITY);
        price.is_finite() && price > current
    }

    /// Replace the stored high for `exchange` unconditionally.
    pub fn set_high(&mut self, exchange: &str, price: f64) {
        match self.highs.get_mut(exchange) {
            Some(h) => *h = price,
            None => {
                self.highs.insert(exchange.to_string(), price);
            }
        }
    }

    /// Stored high for `exchange`, if any.
    pub fn high(&self, exchange: &str) -> Option<f64> {
        self.highs.get(exchange).copied()
    }

    /// Install persisted records. When several records name the same exchange
    /// the greatest one wins. Returns the number of exchanges tracked after
    /// loading.
    pub fn load<'a>(&mut self, records: impl IntoIterator<Item = &'a HighRecord>) -> usize {
        for rec in records {
            if !rec.high.is_finite() || self.high(&rec.exchange).is_some_and(|h| h >= rec.high) {
                continue;
            }
            self.set_high(&rec.exchange, rec.high);
        }
        self.highs.len()
    }

    /// Read-only snapshot of every tracked high.
    pub fn get_state(&self) -> HighState {
        HighState { high: self.highs.iter().map(|(k, &p)| (k.clone(), p)).collect() }
    }
}

/// Snapshot returned by [`HighStore::get_state`], ordered by exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighState {
    pub high: BTreeMap<String, f64>,
}

impl fmt::Display for HighState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (exchange, price)) in self.high.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{exchange}: {price}")?;
        }
        f.write_str("}")
    }
}
