//! Cadenza Core - clock contexts and deterministic offline rendering
//!
//! This crate provides the time base that schedulers and synthesizers share:
//! a context that answers "what time is it now?" and broadcasts a tick each
//! time that answer changes, plus an offline specialization that drives the
//! clock itself so a whole composition can be computed faster than real time.
//!
//! # Core Abstractions
//!
//! ## Contexts
//!
//! - [`ClockContext`] - Owns the clock, the engine handle, tick subscribers and timers
//! - [`OfflineContext`] - Virtual clock advanced in [`TICK_STEP`] increments, then renders
//! - [`ContextOptions`] - Clock source, look-ahead and update interval
//!
//! ## Engines
//!
//! - [`RenderingEngine`] - Anything with a channel count and a sample rate
//! - [`OfflineEngine`] - An already-constructed engine that can render a buffer once
//! - [`RenderTarget`] - Either an existing engine or the shape of a new one
//!
//! ## Events
//!
//! - [`TickEmitter`] - Ordered observer list receiving every [`Tick`]
//! - [`TimerId`] - Handle for timeouts and intervals fired from ticks
//!
//! # Example
//!
//! ```rust,ignore
//! use cadenza_core::OfflineContext;
//!
//! let mut ctx = OfflineContext::<MyEngine>::new(2, 1.0, 44100.0)?;
//! ctx.on_tick(|tick, engine| {
//!     engine.schedule_at(tick.time);
//!     Ok(())
//! });
//! let buffer = futures::executor::block_on(ctx.render())?;
//! ```
//!
//! # Execution Model
//!
//! Everything runs on the calling thread. Ticks are delivered in strictly
//! increasing time order and every subscriber returns before the next tick is
//! emitted. The only suspension point of a render is the engine's synthesis
//! future, which is awaited after the last tick.

pub mod buffer;
pub mod clock;
pub mod context;
pub mod emitter;
pub mod engine;
pub mod offline;
pub mod timers;

pub use buffer::AudioBuffer;
pub use clock::{ClockSource, RENDER_QUANTUM, Seconds, TIME_EPSILON, quantum_interval};
pub use context::{ClockContext, ContextOptions};
pub use emitter::{SubscriberError, SubscriptionId, Tick, TickCallback, TickEmitter};
pub use engine::{OfflineEngine, RenderTarget, RenderingEngine};
pub use offline::{MAX_FRAMES, OfflineContext, TICK_STEP};
pub use timers::TimerId;

/// Error types for clock contexts and rendering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed engine handle or construction parameters.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A tick subscriber or timer callback failed; the tick loop was aborted.
    #[error("tick callback failed at {time:.3}s: {source}")]
    Subscriber {
        /// Virtual time of the tick being delivered.
        time: Seconds,
        /// Error returned by the callback.
        #[source]
        source: SubscriberError,
    },

    /// `render()` was called on a context that already rendered.
    #[error("context has already rendered")]
    AlreadyRendered,

    /// The engine cannot render in its current state (e.g. already started).
    #[error("engine is in an invalid state: {0}")]
    InvalidState(String),

    /// The engine failed while synthesizing samples.
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}

/// Convenience result type for context operations.
pub type Result<T> = std::result::Result<T, Error>;
