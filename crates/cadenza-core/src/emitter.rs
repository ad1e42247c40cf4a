//! Tick broadcast to registered subscribers.
//!
//! A [`TickEmitter`] is an ordered observer list. Each [`Tick`] is delivered
//! to every subscriber in registration order, and each subscriber receives
//! mutable access to the engine so it can apply graph changes for that
//! instant. The first failing subscriber aborts delivery; the remaining
//! subscribers do not see the tick.

use crate::clock::Seconds;
use crate::{Error, Result};

/// Error type returned by tick and timer callbacks.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked on every tick with mutable access to the engine.
pub type TickCallback<E> = Box<dyn FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError>>;

/// A notification that the clock has reached a new instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// Clock time of this tick in seconds.
    pub time: Seconds,
    /// Zero-based position of this tick within its context.
    pub index: u64,
}

/// Handle returned by [`TickEmitter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered list of tick subscribers.
///
/// # Example
///
/// ```rust
/// use cadenza_core::{Tick, TickEmitter};
///
/// let mut emitter: TickEmitter<Vec<f64>> = TickEmitter::new();
/// emitter.subscribe(|tick, seen: &mut Vec<f64>| {
///     seen.push(tick.time);
///     Ok(())
/// });
///
/// let mut seen = Vec::new();
/// emitter.emit(Tick { time: 0.25, index: 0 }, &mut seen).unwrap();
/// assert_eq!(seen, vec![0.25]);
/// ```
pub struct TickEmitter<E> {
    subscribers: Vec<(SubscriptionId, TickCallback<E>)>,
    next_id: u64,
}

impl<E> Default for TickEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TickEmitter<E> {
    /// Create an emitter with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a callback. It runs after every previously registered one.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `tick` to every subscriber in registration order.
    pub fn emit(&mut self, tick: Tick, engine: &mut E) -> Result<()> {
        for (_id, callback) in &mut self.subscribers {
            if let Err(source) = callback(tick, engine) {
                #[cfg(feature = "tracing")]
                tracing::warn!(time = tick.time, subscriber = _id.0, "tick subscriber failed");
                return Err(Error::Subscriber {
                    time: tick.time,
                    source,
                });
            }
        }
        Ok(())
    }
}
