//! Time-stamped audio graph consumed by [`SynthEngine`](crate::SynthEngine).
//!
//! The graph is a flat list of scheduled sources (oscillator tones and
//! single-sample impulses) mixed into the output, plus a step automation
//! lane for the master gain. Tick subscribers mutate it while the virtual
//! clock runs; the engine reads the finished graph once when rendering.

use crate::oscillator::Waveform;
use cadenza_core::{Error, Result, Seconds};

/// Identifier of a scheduled source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u32);

/// Parameters of a scheduled oscillator tone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    /// Frequency in Hz.
    pub frequency: f32,
    /// Oscillator waveform.
    pub waveform: Waveform,
    /// Linear gain.
    pub gain: f32,
    /// Stereo position, -1.0 (left) to 1.0 (right).
    pub pan: f32,
    /// Start time in seconds.
    pub start: Seconds,
    /// Time the release begins. `None` sustains to the end of the render.
    pub stop: Option<Seconds>,
    /// Linear fade-in time in seconds.
    pub attack: Seconds,
    /// Linear fade-out time in seconds, starting at `stop`.
    pub release: Seconds,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            waveform: Waveform::Sine,
            gain: 0.5,
            pan: 0.0,
            start: 0.0,
            stop: None,
            attack: 0.005,
            release: 0.01,
        }
    }
}

impl ToneSpec {
    /// A default tone at `frequency` starting at `start`.
    pub fn new(frequency: f32, start: Seconds) -> Self {
        Self {
            frequency,
            start,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        check_time("tone start", self.start)?;
        if let Some(stop) = self.stop {
            check_time("tone stop", stop)?;
            if stop < self.start {
                return Err(Error::Config(format!(
                    "tone stop {stop} is before its start {}",
                    self.start
                )));
            }
        }
        check_time("attack", self.attack)?;
        check_time("release", self.release)?;
        if !(self.frequency.is_finite() && self.frequency >= 0.0) {
            return Err(Error::Config(format!(
                "tone frequency must be non-negative, got {}",
                self.frequency
            )));
        }
        if !self.gain.is_finite() {
            return Err(Error::Config("tone gain must be finite".into()));
        }
        Ok(())
    }
}

/// A source in the graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Source {
    /// An oscillator voice.
    Tone(ToneSpec),
    /// A single sample of value `gain` at time `at`, centred.
    Impulse {
        /// Time of the impulse in seconds.
        at: Seconds,
        /// Sample value.
        gain: f32,
    },
}

impl Source {
    /// Time at which the source begins producing output.
    pub fn start(&self) -> Seconds {
        match self {
            Source::Tone(spec) => spec.start,
            Source::Impulse { at, .. } => *at,
        }
    }
}

/// A master gain change taking effect at `time`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GainPoint {
    /// Time the new gain applies from.
    pub time: Seconds,
    /// Linear gain.
    pub gain: f32,
}

/// Scheduled sources and master gain automation for one render.
#[derive(Clone, Debug)]
pub struct AudioGraph {
    sample_rate: f32,
    channels: usize,
    master_gain: f32,
    sources: Vec<(SourceId, Source)>,
    gain_points: Vec<GainPoint>,
    next_id: u32,
}

impl AudioGraph {
    /// An empty graph with unity master gain.
    pub fn new(channels: usize, sample_rate: f32) -> Self {
        Self {
            sample_rate,
            channels,
            master_gain: 1.0,
            sources: Vec::new(),
            gain_points: Vec::new(),
            next_id: 0,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of output channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Master gain before any automation point.
    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// Set the master gain used before the first automation point.
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
    }

    /// Schedule an oscillator tone.
    pub fn schedule_tone(&mut self, spec: ToneSpec) -> Result<SourceId> {
        spec.validate()?;
        Ok(self.push(Source::Tone(spec)))
    }

    /// Schedule a single-sample impulse.
    pub fn schedule_impulse(&mut self, at: Seconds, gain: f32) -> Result<SourceId> {
        check_time("impulse time", at)?;
        Ok(self.push(Source::Impulse { at, gain }))
    }

    fn push(&mut self, source: Source) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;

        tracing::trace!(id = id.0, start = source.start(), "source scheduled");

        self.sources.push((id, source));
        id
    }

    /// Set when a tone starts its release, replacing any earlier stop time.
    pub fn stop(&mut self, id: SourceId, at: Seconds) -> Result<()> {
        check_time("stop time", at)?;
        match self.sources.iter_mut().find(|(sid, _)| *sid == id) {
            Some((_, Source::Tone(spec))) => {
                if at < spec.start {
                    return Err(Error::Config(format!(
                        "stop time {at} is before tone start {}",
                        spec.start
                    )));
                }
                spec.stop = Some(at);
                Ok(())
            }
            Some((_, Source::Impulse { .. })) => {
                Err(Error::Config("impulses cannot be stopped".into()))
            }
            None => Err(Error::Config(format!("unknown source {id:?}"))),
        }
    }

    /// Change the master gain from `time` onwards.
    ///
    /// Points at equal times apply in the order they were added.
    pub fn set_gain_at(&mut self, time: Seconds, gain: f32) -> Result<()> {
        check_time("gain time", time)?;
        let idx = self.gain_points.partition_point(|p| p.time <= time);
        self.gain_points.insert(idx, GainPoint { time, gain });
        Ok(())
    }

    /// Master gain in effect at `time`.
    pub fn gain_at(&self, time: Seconds) -> f32 {
        let idx = self.gain_points.partition_point(|p| p.time <= time);
        if idx == 0 {
            self.master_gain
        } else {
            self.gain_points[idx - 1].gain
        }
    }

    /// Automation points, sorted by time.
    pub fn gain_points(&self) -> &[GainPoint] {
        &self.gain_points
    }

    /// Look up a scheduled source.
    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, source)| source)
    }

    /// All scheduled sources in scheduling order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().map(|(_, source)| source)
    }

    /// Number of scheduled sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn check_time(what: &str, time: Seconds) -> Result<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{what} must be a non-negative time, got {time}"
        )))
    }
}
