//! Offline rendering context.
//!
//! [`OfflineContext`] replaces the wall clock with a virtual one. Calling
//! [`render`](OfflineContext::render) walks that clock from zero to the
//! render duration in [`TICK_STEP`] increments, emitting a tick at every
//! step, and only then asks the engine to synthesize. Every time-bound graph
//! change a subscriber makes is therefore in place before the first sample is
//! computed.
//!
//! The step is fixed at 5 ms whatever the sample rate, so schedulers see the
//! same temporal resolution at 22.05 kHz and at 192 kHz.

use crate::buffer::AudioBuffer;
use crate::clock::{ClockSource, Seconds, TIME_EPSILON};
use crate::context::{ClockContext, ContextOptions};
use crate::emitter::{SubscriberError, SubscriptionId, Tick};
use crate::engine::{OfflineEngine, RenderTarget};
use crate::timers::TimerId;
use crate::{Error, Result};

/// Virtual clock increment between ticks during a render.
pub const TICK_STEP: Seconds = 0.005;

/// Largest render length accepted from a `(channels, duration, sample_rate)`
/// triple.
pub const MAX_FRAMES: u32 = u32::MAX;

/// A clock context driven by a virtual clock, rendering into an owned engine.
///
/// # Example
///
/// ```rust,ignore
/// use cadenza_core::OfflineContext;
/// use futures::executor::block_on;
///
/// let mut ctx = OfflineContext::<SynthEngine>::new(2, 0.5, 48000.0)?;
/// ctx.on_tick(|tick, engine| {
///     if tick.index == 0 {
///         engine.graph_mut().schedule_impulse(tick.time, 1.0)?;
///     }
///     Ok(())
/// });
/// let buffer = block_on(ctx.render())?;
/// assert_eq!(buffer.length(), 24000);
/// ```
pub struct OfflineContext<E: OfflineEngine> {
    context: ClockContext<E>,
    duration: Seconds,
    rendered: bool,
}

impl<E: OfflineEngine> OfflineContext<E> {
    /// Build a context from either an existing engine or an engine shape.
    pub fn create(target: RenderTarget<E>) -> Result<Self> {
        let (engine, duration) = match target {
            RenderTarget::Engine(engine) => {
                let sample_rate = engine.sample_rate();
                if !(sample_rate.is_finite() && sample_rate > 0.0) {
                    return Err(Error::Config(format!(
                        "engine sample rate must be positive, got {sample_rate}"
                    )));
                }
                let duration = engine.length() as Seconds / sample_rate as Seconds;
                (engine, duration)
            }
            RenderTarget::Shape {
                channels,
                duration,
                sample_rate,
            } => {
                if channels == 0 {
                    return Err(Error::Config("channel count must be at least 1".into()));
                }
                if !(duration.is_finite() && duration >= 0.0) {
                    return Err(Error::Config(format!(
                        "duration must be non-negative, got {duration}"
                    )));
                }
                if !(sample_rate.is_finite() && sample_rate > 0.0) {
                    return Err(Error::Config(format!(
                        "sample rate must be positive, got {sample_rate}"
                    )));
                }
                let frames = (duration * sample_rate as Seconds).round();
                if frames > f64::from(MAX_FRAMES) {
                    return Err(Error::Config(format!(
                        "{duration}s at {sample_rate} Hz exceeds {MAX_FRAMES} frames"
                    )));
                }
                let length = frames as usize;
                (E::with_shape(channels, length, sample_rate)?, duration)
            }
        };

        let mut context = ClockContext::new(engine, ContextOptions::offline())?;
        context.set_name("OfflineContext");

        #[cfg(feature = "tracing")]
        tracing::debug!(
            duration,
            channels = context.engine().channels(),
            length = context.engine().length(),
            "offline context created"
        );

        Ok(Self {
            context,
            duration,
            rendered: false,
        })
    }

    /// Adopt an already-constructed engine.
    pub fn from_engine(engine: E) -> Result<Self> {
        Self::create(RenderTarget::Engine(engine))
    }

    /// Build a new engine with `channels` channels of `duration` seconds.
    pub fn new(channels: usize, duration: Seconds, sample_rate: f32) -> Result<Self> {
        Self::create(RenderTarget::shape(channels, duration, sample_rate))
    }

    /// Virtual clock time. Never reflects the wall clock.
    pub fn now(&self) -> Seconds {
        self.context.now()
    }

    /// Same as [`now`](Self::now).
    pub fn current_time(&self) -> Seconds {
        self.context.immediate()
    }

    /// Render length in seconds.
    pub fn duration(&self) -> Seconds {
        self.duration
    }

    /// Render length in frames.
    pub fn length(&self) -> usize {
        self.context.engine().length()
    }

    /// Number of output channels.
    pub fn channels(&self) -> usize {
        self.context.engine().channels()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.context.sample_rate()
    }

    /// Always [`ClockSource::Offline`].
    pub fn clock_source(&self) -> ClockSource {
        self.context.clock_source()
    }

    /// Identifying label, `"OfflineContext"`.
    pub fn name(&self) -> &'static str {
        self.context.name()
    }

    /// Borrow the underlying clock context.
    pub fn context(&self) -> &ClockContext<E> {
        &self.context
    }

    /// Mutably borrow the underlying clock context.
    pub fn context_mut(&mut self) -> &mut ClockContext<E> {
        &mut self.context
    }

    /// Borrow the engine.
    pub fn engine(&self) -> &E {
        self.context.engine()
    }

    /// Mutably borrow the engine.
    pub fn engine_mut(&mut self) -> &mut E {
        self.context.engine_mut()
    }

    /// Consume the context, returning its engine.
    pub fn into_engine(self) -> E {
        self.context.into_engine()
    }

    /// Register a tick subscriber. See [`ClockContext::on_tick`].
    pub fn on_tick<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        self.context.on_tick(callback)
    }

    /// Remove a tick subscriber.
    pub fn off_tick(&mut self, id: SubscriptionId) -> bool {
        self.context.off_tick(id)
    }

    /// See [`ClockContext::set_timeout`].
    pub fn set_timeout<F>(&mut self, callback: F, delay: Seconds) -> Result<TimerId>
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        self.context.set_timeout(callback, delay)
    }

    /// See [`ClockContext::set_interval`].
    pub fn set_interval<F>(&mut self, callback: F, interval: Seconds) -> Result<TimerId>
    where
        F: FnMut(Tick, &mut E) -> std::result::Result<(), SubscriberError> + 'static,
    {
        self.context.set_interval(callback, interval)
    }

    /// Cancel a pending timeout.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.context.clear_timeout(id)
    }

    /// Cancel an interval.
    pub fn clear_interval(&mut self, id: TimerId) -> bool {
        self.context.clear_interval(id)
    }

    /// Number of ticks emitted so far.
    pub fn ticks_emitted(&self) -> u64 {
        self.context.ticks_emitted()
    }

    /// Returns true once [`render`](Self::render) has been called.
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Advance the virtual clock through the whole duration, then synthesize.
    ///
    /// Ticks are emitted at `0, TICK_STEP, 2 * TICK_STEP, ...` up to and
    /// including the last multiple of [`TICK_STEP`] not past the duration,
    /// which is `floor(duration / TICK_STEP) + 1` ticks: 201 for one second,
    /// 3 for 0.012 s, 1 for a zero-length render.
    /// Clock times are computed from the step count, so long renders do not
    /// accumulate rounding drift.
    ///
    /// A context renders once; later calls fail with
    /// [`Error::AlreadyRendered`] without emitting ticks. Subscriber failures
    /// abort the render before synthesis starts. Engine failures are returned
    /// unchanged.
    pub async fn render(&mut self) -> Result<AudioBuffer> {
        if self.rendered {
            return Err(Error::AlreadyRendered);
        }
        self.rendered = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(duration = self.duration, "offline render started");

        let mut steps: u64 = 0;
        while self.duration - self.current_time() >= -TIME_EPSILON {
            self.context.emit_tick()?;
            steps += 1;
            self.context.advance_clock(steps as Seconds * TICK_STEP);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            ticks = steps,
            current_time = self.current_time(),
            "tick loop finished, synthesizing"
        );

        self.context.engine_mut().start_rendering().await
    }

    /// Close the context. There is no device to release, so this always succeeds.
    pub async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RenderingEngine;
    use futures::executor::block_on;

    #[derive(Debug)]
    struct Blank {
        channels: usize,
        length: usize,
        sample_rate: f32,
        renders: u32,
    }

    impl RenderingEngine for Blank {
        fn channels(&self) -> usize {
            self.channels
        }

        fn sample_rate(&self) -> f32 {
            self.sample_rate
        }
    }

    impl OfflineEngine for Blank {
        fn with_shape(channels: usize, length: usize, sample_rate: f32) -> Result<Self> {
            Ok(Self {
                channels,
                length,
                sample_rate,
                renders: 0,
            })
        }

        fn length(&self) -> usize {
            self.length
        }

        async fn start_rendering(&mut self) -> Result<AudioBuffer> {
            self.renders += 1;
            Ok(AudioBuffer::new(self.channels, self.length, self.sample_rate))
        }
    }

    #[test]
    fn shape_and_engine_forms_agree() {
        let from_shape = OfflineContext::<Blank>::new(2, 1.0, 44100.0).unwrap();
        let engine = Blank::with_shape(2, 44100, 44100.0).unwrap();
        let from_engine = OfflineContext::from_engine(engine).unwrap();

        assert_eq!(from_shape.duration(), from_engine.duration());
        assert_eq!(from_shape.sample_rate(), from_engine.sample_rate());
        assert_eq!(from_shape.length(), 44100);
        assert_eq!(from_shape.channels(), 2);
    }

    #[test]
    fn offline_context_identity() {
        let ctx = OfflineContext::<Blank>::new(1, 0.1, 48000.0).unwrap();
        assert_eq!(ctx.name(), "OfflineContext");
        assert_eq!(ctx.clock_source(), ClockSource::Offline);
        assert_eq!(ctx.context().look_ahead(), 0.0);
        assert!((ctx.context().update_interval() - 128.0 / 48000.0).abs() < 1e-12);
        assert_eq!(ctx.now(), 0.0);
    }

    #[test]
    fn rejects_invalid_shapes() {
        assert!(matches!(
            OfflineContext::<Blank>::new(0, 1.0, 48000.0),
            Err(Error::Config(_))
        ));
        assert!(OfflineContext::<Blank>::new(2, -1.0, 48000.0).is_err());
        assert!(OfflineContext::<Blank>::new(2, f64::NAN, 48000.0).is_err());
        assert!(OfflineContext::<Blank>::new(2, 1.0, 0.0).is_err());
        assert!(matches!(
            OfflineContext::<Blank>::new(1, 1e300, 48000.0),
            Err(Error::Config(_))
        ));

        let broken = Blank {
            channels: 2,
            length: 100,
            sample_rate: 0.0,
            renders: 0,
        };
        assert!(OfflineContext::from_engine(broken).is_err());
    }

    #[test]
    fn tick_count_is_floor_of_steps_plus_one() {
        for (duration, ticks) in [(0.0, 1), (0.004, 1), (0.012, 3), (0.02, 5), (1.0, 201)] {
            let mut ctx = OfflineContext::<Blank>::new(1, duration, 8000.0).unwrap();
            block_on(ctx.render()).unwrap();
            assert_eq!(ctx.ticks_emitted(), ticks, "duration {duration}");
        }
    }

    #[test]
    fn length_limit_is_inclusive() {
        let at_limit = f64::from(MAX_FRAMES) / 1000.0;
        let ctx = OfflineContext::<Blank>::new(1, at_limit, 1000.0).unwrap();
        assert_eq!(ctx.length(), MAX_FRAMES as usize);
        assert!(OfflineContext::<Blank>::new(1, at_limit + 0.01, 1000.0).is_err());
    }

    #[test]
    fn render_ticks_then_synthesizes_once() {
        let mut ctx = OfflineContext::<Blank>::new(2, 0.02, 48000.0).unwrap();
        let buffer = block_on(ctx.render()).unwrap();

        assert_eq!(ctx.ticks_emitted(), 5);
        assert_eq!(ctx.engine().renders, 1);
        assert_eq!(buffer.length(), 960);
        assert!(ctx.current_time() >= ctx.duration());
        assert!(ctx.current_time() <= ctx.duration() + TICK_STEP + TIME_EPSILON);
    }

    #[test]
    fn second_render_is_rejected() {
        let mut ctx = OfflineContext::<Blank>::new(1, 0.01, 8000.0).unwrap();
        block_on(ctx.render()).unwrap();
        let ticks = ctx.ticks_emitted();

        assert!(matches!(block_on(ctx.render()), Err(Error::AlreadyRendered)));
        assert_eq!(ctx.ticks_emitted(), ticks);
        assert_eq!(ctx.engine().renders, 1);
    }

    #[test]
    fn close_leaves_clock_untouched() {
        let mut ctx = OfflineContext::<Blank>::new(1, 0.01, 8000.0).unwrap();
        block_on(ctx.render()).unwrap();
        let time = ctx.current_time();
        block_on(ctx.close()).unwrap();
        assert_eq!(ctx.current_time(), time);
    }

    #[test]
    fn zero_duration_emits_single_tick() {
        let mut ctx = OfflineContext::<Blank>::new(1, 0.0, 8000.0).unwrap();
        let buffer = block_on(ctx.render()).unwrap();
        assert_eq!(ctx.ticks_emitted(), 1);
        assert!(buffer.is_empty());
    }
}
