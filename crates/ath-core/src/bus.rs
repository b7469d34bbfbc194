//! Event bus contract and an in-process implementation.
//!
//! The recipe never owns the bus; it receives an `Arc<dyn EventBus>` and
//! registers handlers on it. Emission is one-way: [`EventBus::emit`] returns
//! nothing, gives no delivery acknowledgement, and never retries. A
//! collaborator that fails reports it by emitting on its own `*.ERROR` name.
//!
//! # Patterns
//!
//! Names are `.`-separated segments (`gdax.TRADE`, `media.CREATE:DONE`). A
//! subscription pattern matches a name segment by segment, where `*` stands
//! for exactly one segment. The pattern `**` matches every event.
//!
//! ```text
//! *.ERROR   matches  gdax.ERROR, media.ERROR
//! *.ERROR   misses   ERROR, a.b.ERROR, gdax.ERROR:DONE
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::events::Event;

/// Callback invoked for each matching event.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscribe/emit capability shared by the recipe and its collaborators.
pub trait EventBus: Send + Sync {
    /// Deliver an event to every matching subscriber. Fire-and-forget.
    fn emit(&self, name: &str, payload: Value);

    /// Register `handler` for every event whose name matches `pattern`.
    fn subscribe(&self, pattern: &str, handler: Handler) -> SubscriptionId;

    /// Remove a subscription. Returns `false` if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Typed helpers over any [`EventBus`].
pub trait EventBusExt: EventBus {
    /// Serialize `payload` and emit it. A payload that cannot be serialized is
    /// logged and dropped.
    fn emit_json<T: Serialize>(&self, name: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(v) => self.emit(name, v),
            Err(e) => warn!("dropping {name}: payload not serializable: {e}"),
        }
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A parsed subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `**` matches every event.
    All,
    /// Segment-wise match; `None` is a `*` wildcard.
    Segments(Vec<Option<String>>),
}

impl Pattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "**" {
            return Self::All;
        }
        Self::Segments(
            pattern
                .split('.')
                .map(|seg| (seg != "*").then(|| seg.to_string()))
                .collect(),
        )
    }

    pub fn matches(&self, name: &str) -> bool {
        let segments = match self {
            Self::All => return true,
            Self::Segments(s) => s,
        };
        let mut parts = name.split('.');
        for seg in segments {
            match (seg, parts.next()) {
                (_, None) => return false,
                (None, Some(_)) => {}
                (Some(want), Some(got)) if want == got => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }
}

// ---------------------------------------------------------------------------
// LocalBus
// ---------------------------------------------------------------------------

struct Subscriber {
    id: SubscriptionId,
    pattern: Pattern,
    handler: Handler,
}

/// Synchronous in-process bus.
///
/// `emit` runs every matching handler, in registration order, on the calling
/// task before it returns. Handlers may emit further events; those are
/// dispatched depth-first. The subscriber list is snapshotted before dispatch,
/// so a handler may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct LocalBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl EventBus for LocalBus {
    fn emit(&self, name: &str, payload: Value) {
        let handlers: Vec<Handler> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.pattern.matches(name))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        if handlers.is_empty() {
            trace!("{name}: no subscribers");
            return;
        }

        let event = Event::new(name, payload);
        for handler in handlers {
            handler(&event);
        }
    }

    fn subscribe(&self, pattern: &str, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, pattern: Pattern::parse(pattern), handler });
        trace!("subscribed {id:?} to {pattern}");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }
}
