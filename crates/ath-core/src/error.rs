//! Typed error definitions for the all-time-high recipe.
//!
//! Provides [`AthError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`.

use thiserror::Error;

/// Domain-specific errors for the all-time-high recipe.
#[derive(Debug, Error)]
pub enum AthError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Highs collection read or write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// An event payload did not match the shape expected for its name.
    #[error("event `{name}` has an invalid payload: {reason}")]
    Event { name: String, reason: String },

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the workspace crates.
pub type Result<T> = std::result::Result<T, AthError>;
