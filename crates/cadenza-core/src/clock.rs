//! Time sources backing a context's notion of "now".
//!
//! A context is bound to exactly one [`ClockSource`] for its whole lifetime.
//! The realtime source follows the wall clock from the moment the context is
//! built; the offline source only moves when its owner advances it.

use std::time::Instant;

/// Time in seconds.
pub type Seconds = f64;

/// Frames per render quantum, the block size engines process at once.
pub const RENDER_QUANTUM: usize = 128;

/// Tolerance for comparing accumulated clock times against targets.
pub const TIME_EPSILON: Seconds = 1e-9;

/// Duration of one render quantum at the given sample rate.
///
/// This is the default update interval of every context.
///
/// # Example
///
/// ```rust
/// use cadenza_core::quantum_interval;
///
/// let interval = quantum_interval(44100.0);
/// assert!((interval - 128.0 / 44100.0).abs() < 1e-12);
/// ```
pub fn quantum_interval(sample_rate: f32) -> Seconds {
    RENDER_QUANTUM as Seconds / sample_rate as Seconds
}

/// Selects which clock implementation backs a context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockSource {
    /// Wall-clock time elapsed since the context was created.
    #[default]
    Realtime,
    /// Virtual time, advanced explicitly by the owning context.
    Offline,
}

/// Clock state for one context.
#[derive(Debug, Clone)]
pub(crate) enum Clock {
    Realtime { origin: Instant },
    Offline { time: Seconds },
}

impl Clock {
    pub(crate) fn new(source: ClockSource) -> Self {
        match source {
            ClockSource::Realtime => Clock::Realtime {
                origin: Instant::now(),
            },
            ClockSource::Offline => Clock::Offline { time: 0.0 },
        }
    }

    pub(crate) fn source(&self) -> ClockSource {
        match self {
            Clock::Realtime { .. } => ClockSource::Realtime,
            Clock::Offline { .. } => ClockSource::Offline,
        }
    }

    /// Current clock reading, without any look-ahead.
    pub(crate) fn elapsed(&self) -> Seconds {
        match self {
            Clock::Realtime { origin } => origin.elapsed().as_secs_f64(),
            Clock::Offline { time } => *time,
        }
    }

    /// Moves a virtual clock forward to `target`.
    ///
    /// Targets earlier than the current reading are ignored so the clock
    /// never runs backwards. Realtime clocks are not affected.
    pub(crate) fn advance_to(&mut self, target: Seconds) {
        if let Clock::Offline { time } = self {
            *time = time.max(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_clock_starts_at_zero() {
        let clock = Clock::new(ClockSource::Offline);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.source(), ClockSource::Offline);
    }

    #[test]
    fn offline_clock_never_moves_backwards() {
        let mut clock = Clock::new(ClockSource::Offline);
        clock.advance_to(0.5);
        clock.advance_to(0.25);
        assert_eq!(clock.elapsed(), 0.5);
    }

    #[test]
    fn realtime_clock_ignores_advance() {
        let mut clock = Clock::new(ClockSource::Realtime);
        clock.advance_to(100.0);
        assert!(clock.elapsed() < 100.0);
        assert_eq!(clock.source(), ClockSource::Realtime);
    }

    #[test]
    fn realtime_clock_is_monotonic() {
        let clock = Clock::new(ClockSource::Realtime);
        let a = clock.elapsed();
        let b = clock.elapsed();
        assert!(b >= a);
    }

    #[test]
    fn quantum_interval_matches_block_size() {
        assert!((quantum_interval(48000.0) - 0.0026666666666666666).abs() < 1e-12);
        assert!(quantum_interval(44100.0) > 0.0);
    }
}
