//! # ath-recipe
//!
//! The all-time-high recipe and the pieces it is built from.
//!
//! ## Architecture
//!
//! A recipe is handed an event bus and a highs collection, registers its
//! handlers on [`Recipe::start`] and removes them on [`Recipe::stop`]. It owns
//! no threads; all work happens inside bus dispatch, debounce timers and the
//! spawned highs writes.
//!
//! - [`all_time_high`]: subscription wiring for the recipe
//! - [`store`]: per-exchange high tracking
//! - [`debounce`]: keyed quiet-period coalescing
//! - [`highs`]: persistent highs collection (memory / JSON file)
//! - [`media`]: image composition and caption text

pub mod all_time_high;
pub mod debounce;
pub mod highs;
pub mod media;
pub mod store;

use anyhow::Result;
use async_trait::async_trait;

pub use all_time_high::AllTimeHighRecipe;

/// Trait implemented by all recipes.
///
/// Only `Send` is required (not `Sync`) because recipes are driven
/// sequentially by the runner, never concurrently.
#[async_trait]
pub trait Recipe: Send {
    /// Human-readable recipe name.
    fn name(&self) -> &str;
    /// Load persisted state and register event handlers.
    async fn start(&mut self) -> Result<()>;
    /// Remove event handlers and drop pending work.
    async fn stop(&mut self) -> Result<()>;
}
