//! Cadenza Synth - reference offline engine for cadenza contexts
//!
//! This crate provides an [`OfflineEngine`](cadenza_core::OfflineEngine)
//! implementation so an [`OfflineContext`](cadenza_core::OfflineContext) can
//! render something audible.
//!
//! # Core Components
//!
//! ## Oscillators
//!
//! - [`Oscillator`] - Audio oscillator with PolyBLEP anti-aliasing
//! - [`Waveform`] - Sine, Triangle, Saw, Square, Pulse, Noise
//!
//! ## Graph
//!
//! - [`AudioGraph`] - Scheduled tones, impulses and master gain automation
//! - [`ToneSpec`] - Frequency, waveform, gain, pan and envelope of one tone
//!
//! ## Engine
//!
//! - [`SynthEngine`] - Renders the graph sample-accurately, once
//!
//! ```rust
//! use cadenza_core::OfflineContext;
//! use cadenza_synth::SynthEngine;
//! use futures::executor::block_on;
//!
//! let mut ctx = OfflineContext::<SynthEngine>::new(1, 0.05, 8000.0).unwrap();
//! ctx.on_tick(|tick, engine| {
//!     if tick.index == 0 {
//!         engine.graph_mut().schedule_impulse(tick.time, 1.0)?;
//!     }
//!     Ok(())
//! });
//! let buffer = block_on(ctx.render()).unwrap();
//! assert_eq!(buffer.channel(0).unwrap()[0], 1.0);
//! ```

pub mod engine;
pub mod graph;
pub mod oscillator;

pub use engine::{RenderState, SynthEngine};
pub use graph::{AudioGraph, GainPoint, Source, SourceId, ToneSpec};
pub use oscillator::{Oscillator, Waveform};
