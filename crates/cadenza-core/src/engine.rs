//! Rendering engine seams.
//!
//! The context never synthesizes samples itself. It holds one engine handle
//! and, for offline renders, asks that engine for the finished buffer once
//! every tick has been delivered.
//!
//! Two traits split the capability:
//!
//! - [`RenderingEngine`]: what any context needs to configure its clock
//!   (channel count, sample rate).
//! - [`OfflineEngine`]: an already-constructed offline engine. It knows its
//!   total length and can synthesize exactly once. Implementing this trait is
//!   what distinguishes an engine from a bare `(channels, duration, rate)`
//!   shape when building an [`OfflineContext`](crate::OfflineContext).

use crate::Result;
use crate::buffer::AudioBuffer;
use crate::clock::Seconds;
use std::future::Future;

/// An engine a context can be bound to.
pub trait RenderingEngine {
    /// Number of output channels.
    fn channels(&self) -> usize;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> f32;
}

/// An offline engine that renders a fixed number of frames into a buffer.
///
/// # Example
///
/// ```rust,ignore
/// struct Silence { channels: usize, length: usize, sample_rate: f32 }
///
/// impl RenderingEngine for Silence {
///     fn channels(&self) -> usize { self.channels }
///     fn sample_rate(&self) -> f32 { self.sample_rate }
/// }
///
/// impl OfflineEngine for Silence {
///     fn with_shape(channels: usize, length: usize, sample_rate: f32) -> Result<Self> {
///         Ok(Self { channels, length, sample_rate })
///     }
///     fn length(&self) -> usize { self.length }
///     async fn start_rendering(&mut self) -> Result<AudioBuffer> {
///         Ok(AudioBuffer::new(self.channels, self.length, self.sample_rate))
///     }
/// }
/// ```
pub trait OfflineEngine: RenderingEngine {
    /// Build a new engine for `channels` channels of `length` frames.
    fn with_shape(channels: usize, length: usize, sample_rate: f32) -> Result<Self>
    where
        Self: Sized;

    /// Total number of frames the engine renders.
    fn length(&self) -> usize;

    /// Synthesize the complete buffer.
    ///
    /// Engines reject a second call with [`Error::InvalidState`](crate::Error::InvalidState).
    fn start_rendering(&mut self) -> impl Future<Output = Result<AudioBuffer>>;
}

/// What an [`OfflineContext`](crate::OfflineContext) renders into.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderTarget<E> {
    /// Adopt an already-constructed engine; duration is `length / sample_rate`.
    Engine(E),
    /// Build a fresh engine of this shape.
    Shape {
        /// Number of output channels.
        channels: usize,
        /// Render length in seconds.
        duration: Seconds,
        /// Sample rate in Hz.
        sample_rate: f32,
    },
}

impl<E> RenderTarget<E> {
    /// Shorthand for [`RenderTarget::Shape`].
    pub fn shape(channels: usize, duration: Seconds, sample_rate: f32) -> Self {
        RenderTarget::Shape {
            channels,
            duration,
            sample_rate,
        }
    }
}
