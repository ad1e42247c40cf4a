//! The clock context: a time source plus a tick channel.
//!
//! [`ClockContext`] binds an engine handle to one clock for its whole
//! lifetime and owns everything that reacts to that clock: tick
//! subscribers and tick-driven timers. Whatever drives the context (an
//! offline render loop, or an external realtime ticker) calls
//! [`ClockContext::emit_tick`] whenever time has moved.

use crate::clock::{Clock, ClockSource, Seconds, quantum_interval};
use crate::emitter::{SubscriberError, SubscriptionId, Tick, TickEmitter};
use crate::engine::RenderingEngine;
use crate::timers::{TimerId, Timers};
use crate::{Error, Result};

/// Options recognized when building a [`ClockContext`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextOptions {
    /// Which clock backs `now()`. Fixed for the context's lifetime.
    pub clock_source: ClockSource,
    /// Scheduling horizon in seconds, added to `now()`.
    pub look_ahead: Seconds,
    /// Clock sampling granularity. `None` derives one render quantum
    /// (`128 / sample_rate`) from the engine.
    pub update_interval: Option<Seconds>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            clock_source: ClockSource::Realtime,
            look_ahead: 0.1,
            update_interval: None,
        }
    }
}

impl ContextOptions {
    /// Options for a virtual clock with no look-ahead.
    pub fn offline() -> Self {
        Self {
            clock_source: ClockSource::Offline,
            look_ahead: 0.0,
            update_interval: None,
        }
    }
}

/// Execution context exposing "now" and a tick channel.
///
/// # Example
///
/// ```rust,ignore
/// use cadenza_core::{ClockContext, ContextOptions};
///
/// let mut ctx = ClockContext::new(engine, ContextOptions::default())?;
/// ctx.on_tick(|tick, engine| {
///     engine.schedule_at(tick.time);
///     Ok(())
/// });
/// ctx.emit_tick()?;
/// ```
pub struct ClockContext<E> {
    name: &'static str,
    clock: Clock,
    look_ahead: Seconds,
    update_interval: Seconds,
    sample_rate: f32,
    engine: E,
    emitter: TickEmitter<E>,
    timers: Timers<E>,
    ticks_emitted: u64,
}

impl<E: RenderingEngine> ClockContext<E> {
    /// Bind a context to `engine`.
    ///
    /// Fails with [`Error::Config`] if the engine reports an unusable shape
    /// or the options are out of range.
    pub fn new(engine: E, options: ContextOptions) -> Result<Self> {
        let sample_rate = engine.sample_rate();
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::Config(format!(
                "engine sample rate must be positive, got {sample_rate}"
            )));
        }
        if engine.channels() == 0 {
            return Err(Error::Config("engine must have at least one channel".into()));
        }
        if !(options.look_ahead.is_finite() && options.look_ahead >= 0.0) {
            return Err(Error::Config(format!(
                "look-ahead must be non-negative, got {}",
                options.look_ahead
            )));
        }

        let update_interval = options
            .update_interval
            .unwrap_or_else(|| quantum_interval(sample_rate));
        if !(update_interval.is_finite() && update_interval > 0.0) {
            return Err(Error::Config(format!(
                "update interval must be positive, got {update_interval}"
            )));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            clock_source = ?options.clock_source,
            sample_rate,
            look_ahead = options.look_ahead,
            update_interval,
            "context created"
        );

        Ok(Self {
            name: "Context",
            clock: Clock::new(options.clock_source),
            look_ahead: options.look_ahead,
            update_interval,
            sample_rate,
            engine,
            emitter: TickEmitter::new(),
            timers: Timers::new(),
            ticks_emitted: 0,
        })
    }
}

impl<E> ClockContext<E> {
    /// Identifying label.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn set_name(&mut self, name: &'static str) {
        self.name = name;
    }

    /// The clock source chosen at construction.
    pub fn clock_source(&self) -> ClockSource {
        self.clock.source()
    }

    /// Returns true for a virtual clock.
    pub fn is_offline(&self) -> bool {
        self.clock_source() == ClockSource::Offline
    }

    /// Scheduling horizon in seconds.
    pub fn look_ahead(&self) -> Seconds {
        self.look_ahead
    }

    /// Clock sampling granularity in seconds.
    pub fn update_interval(&self) -> Seconds {
        self.update_interval
    }

    /// Sample rate of the bound engine.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current time including look-ahead.
    pub fn now(&self) -> Seconds {
        self.immediate() + self.look_ahead
    }

    /// Current time without look-ahead.
    pub fn immediate(&self) -> Seconds {
        self.clock.elapsed()
    }

    /// Moves a virtual clock forward. No effect on a realtime clock.
    pub(crate) fn advance_clock(&mut self, time: Seconds) {
        self.clock.advance_to(time);
    }

    /// Borrow the engine handle.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutably borrow the engine handle.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consume the context, returning its engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Register a tick subscriber.
    pub fn on_tick<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        self.emitter.subscribe(callback)
    }

    /// Remove a tick subscriber. Returns false if it was not registered.
    pub fn off_tick(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Number of registered tick subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.emitter.len()
    }

    /// Run `callback` once, on the first tick at or after `now() + delay`.
    pub fn set_timeout<F>(&mut self, callback: F, delay: Seconds) -> Result<TimerId>
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        if !delay.is_finite() {
            return Err(Error::Config(format!("timeout must be finite, got {delay}")));
        }
        Ok(self.timers.add(self.now() + delay, None, callback))
    }

    /// Run `callback` every `interval` seconds, starting at `now() + interval`.
    ///
    /// Fires at most once per tick. Repeats that fall inside one tick are
    /// skipped.
    pub fn set_interval<F>(&mut self, callback: F, interval: Seconds) -> Result<TimerId>
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::Config(format!(
                "interval must be positive, got {interval}"
            )));
        }
        Ok(self
            .timers
            .add(self.now() + interval, Some(interval), callback))
    }

    /// Cancel a pending timeout. Returns false if it already fired or was cleared.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Cancel an interval. Returns false if it was already cleared.
    pub fn clear_interval(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Number of pending timeouts and intervals.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of ticks emitted so far.
    pub fn ticks_emitted(&self) -> u64 {
        self.ticks_emitted
    }

    /// Broadcast a tick at `now()`.
    ///
    /// Due timers run first, then subscribers in registration order. Every
    /// callback returns before this does.
    pub fn emit_tick(&mut self) -> Result<Tick> {
        let tick = Tick {
            time: self.now(),
            index: self.ticks_emitted,
        };
        self.ticks_emitted += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(time = tick.time, index = tick.index, "tick");

        self.timers.fire(tick, &mut self.engine)?;
        self.emitter.emit(tick, &mut self.engine)?;
        Ok(tick)
    }
}
