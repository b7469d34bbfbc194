//! Event names and the envelope carried by the bus.
//!
//! The names are the wire format shared with every collaborator on the bus
//! (market feed, renderer, social client), so they must not change.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AthError, Result};

/// A trade printed by the exchange feed.
pub const TRADE: &str = "gdax.TRADE";
/// The exchange feed connection closed.
pub const FEED_CLOSE: &str = "gdax.CLOSE";
/// A trade beat the tracked high for its exchange.
pub const NEW_HIGH: &str = "core.NEW_HIGH";
/// Request to render the announcement image.
pub const MEDIA_CREATE: &str = "media.CREATE";
/// The renderer finished an image.
pub const MEDIA_CREATE_DONE: &str = "media.CREATE:DONE";
/// Request to post the rendered image with a caption.
pub const POST_MEDIA: &str = "twitter.POST_MEDIA";
/// The social client finished posting.
pub const POST_MEDIA_DONE: &str = "twitter.POST_MEDIA:DONE";
/// A highs collection write failed.
pub const DB_ERROR: &str = "db.ERROR";
/// Any collaborator's error channel.
pub const ANY_ERROR: &str = "*.ERROR";

/// A named event with a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self { name: name.into(), payload }
    }

    /// Decode the payload into the typed shape expected for this event.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.payload).map_err(|e| AthError::Event {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}
