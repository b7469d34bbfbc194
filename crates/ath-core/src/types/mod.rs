//! Payload types carried on the bus and stored in the highs collection.
//!
//! Every struct here serializes to the exact JSON document its event name
//! carries on the wire (see [`crate::events`]).

pub mod highs;
pub mod market_data;
pub mod notification;

pub use highs::*;
pub use market_data::*;
pub use notification::*;
