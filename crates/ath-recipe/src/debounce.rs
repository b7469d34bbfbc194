//! Keyed, timer-based debouncing.
//!
//! [`Debouncer::push`] records the latest value for a key and (re)arms a quiet
//! period timer for it. When the timer expires without another push for the
//! same key, the sink runs once with the last value. Keys are independent: a
//! burst on one exchange never delays another.
//!
//! ```text
//! push(gdax, 60000) ──200ms── push(gdax, 61000) ──1000ms quiet──► sink(61000)
//! ```
//!
//! Timers are tokio tasks spawned on the runtime captured by
//! [`Debouncer::new`]; re-arming aborts the previous task.

use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ahash::AHashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Callback run with the settled value.
pub type Sink<V> = Arc<dyn Fn(V) + Send + Sync>;

struct Slot {
    seq: u64,
    task: JoinHandle<()>,
}

struct Timers<K> {
    next_seq: u64,
    slots: AHashMap<K, Slot>,
}

impl<K> Timers<K> {
    fn abort_all(&mut self) {
        for (_, slot) in self.slots.drain() {
            slot.task.abort();
        }
    }
}

pub struct Debouncer<K, V> {
    quiet: Duration,
    sink: Sink<V>,
    runtime: Handle,
    timers: Arc<Mutex<Timers<K>>>,
}

impl<K, V> Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Create a debouncer on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(quiet: Duration, sink: Sink<V>) -> Self {
        Self {
            quiet,
            sink,
            runtime: Handle::current(),
            timers: Arc::new(Mutex::new(Timers { next_seq: 0, slots: AHashMap::new() })),
        }
    }

    /// Record `value` as the latest for `key` and restart its quiet period.
    pub fn push(&self, key: K, value: V) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.next_seq += 1;
        let seq = timers.next_seq;
        if let Some(prev) = timers.slots.remove(&key) {
            prev.task.abort();
        }

        let quiet = self.quiet;
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.timers);
        let task_key = key.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(quiet).await;
            // A timer that woke while being replaced must not fire: only the
            // slot's current owner may.
            let owns_slot = {
                let mut timers = shared.lock().unwrap_or_else(PoisonError::into_inner);
                match timers.slots.get(&task_key) {
                    Some(slot) if slot.seq == seq => {
                        timers.slots.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if owns_slot {
                sink(value);
            }
        });
        timers.slots.insert(key, Slot { seq, task });
    }

    /// Number of keys with an armed timer.
    pub fn pending(&self) -> usize {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner).slots.len()
    }

    /// Drop every pending value without running the sink.
    pub fn cancel_all(&self) {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner).abort_all();
    }
}

impl<K, V> Drop for Debouncer<K, V> {
    fn drop(&mut self) {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner).abort_all();
    }
}
