//! # ath-core
//!
//! Core crate for the all-time-high recipe, providing:
//!
//! - **Types** (`types`): trade, new-high, media and social payloads, high records
//! - **Events** (`events`): wire names and the [`events::Event`] envelope
//! - **Bus** (`bus`): the [`bus::EventBus`] contract and the synchronous [`bus::LocalBus`]
//! - **Configuration** (`config`): JSON config deserialization and validation
//! - **Error types** (`error`): domain-specific `AthError` via thiserror
//! - **Formatting** (`format`): dollar amounts and long dates for notifications
//! - **JSON utilities** (`json_util`): string-or-number prices, payload trimming
//! - **Logging** (`logging`): tracing-based structured logging

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod json_util;
pub mod logging;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
