//! Offline synthesis engine.
//!
//! [`SynthEngine`] turns an [`AudioGraph`] into an [`AudioBuffer`]. Sources
//! are placed sample-accurately: something scheduled at `t` seconds starts
//! at frame `round(t * sample_rate)`. Output is computed one render quantum
//! (128 frames) at a time, with voice state carried across quanta.

use crate::graph::{AudioGraph, Source, ToneSpec};
use crate::oscillator::Oscillator;
use cadenza_core::{
    AudioBuffer, Error, OfflineEngine, RENDER_QUANTUM, RenderingEngine, Result, Seconds,
};
use std::f32::consts::FRAC_PI_4;

/// Lifecycle of a [`SynthEngine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderState {
    /// Accepting graph changes; not rendered yet.
    #[default]
    Idle,
    /// Synthesis in progress.
    Rendering,
    /// Buffer produced. The engine cannot render again.
    Finished,
}

/// One source prepared for rendering.
struct Voice {
    kind: VoiceKind,
    start: usize,
    /// First frame after the voice has fully faded out.
    end: usize,
    stop: Option<usize>,
    attack: usize,
    release: usize,
    gain: f32,
    /// Per-output-channel gain.
    spread: Vec<f32>,
}

enum VoiceKind {
    Tone(Oscillator),
    Impulse,
}

impl Voice {
    fn tone(spec: &ToneSpec, sample_rate: f32, channels: usize, length: usize) -> Self {
        let to_frame = |t: Seconds| (t * sample_rate as Seconds).round() as usize;
        let mut osc = Oscillator::new(sample_rate);
        osc.set_frequency(spec.frequency);
        osc.set_waveform(spec.waveform);

        let start = to_frame(spec.start);
        let stop = spec.stop.map(to_frame);
        let release = to_frame(spec.release);
        let end = stop.map_or(length, |s| (s + release).min(length));

        Self {
            kind: VoiceKind::Tone(osc),
            start,
            end,
            stop,
            attack: to_frame(spec.attack),
            release,
            gain: spec.gain,
            spread: pan_gains(spec.pan, channels),
        }
    }

    fn impulse(at: Seconds, gain: f32, sample_rate: f32, channels: usize) -> Self {
        let start = (at * sample_rate as Seconds).round() as usize;
        Self {
            kind: VoiceKind::Impulse,
            start,
            end: start + 1,
            stop: None,
            attack: 0,
            release: 0,
            gain,
            spread: vec![1.0; channels],
        }
    }

    /// Envelope level at absolute `frame` (not before `start`).
    fn envelope(&self, frame: usize) -> f32 {
        let offset = frame - self.start;
        let attack = if self.attack == 0 {
            1.0
        } else {
            (offset as f32 / self.attack as f32).min(1.0)
        };
        let release = match self.stop {
            Some(stop) if frame >= stop && self.release > 0 => {
                1.0 - ((frame - stop) as f32 / self.release as f32).min(1.0)
            }
            Some(stop) if frame >= stop => 0.0,
            _ => 1.0,
        };
        attack * release
    }

    /// Mix this voice's contribution to `[from, to)` into `out`.
    fn render_into(&mut self, from: usize, to: usize, out: &mut AudioBuffer, scratch: &mut [f32]) {
        let lo = from.max(self.start);
        let hi = to.min(self.end);
        if lo >= hi {
            return;
        }
        let scratch = &mut scratch[..hi - lo];
        match &mut self.kind {
            VoiceKind::Tone(osc) => {
                osc.fill(scratch);
                for (i, sample) in scratch.iter_mut().enumerate() {
                    *sample *= self.gain * self.envelope(lo + i);
                }
            }
            VoiceKind::Impulse => scratch[0] = self.gain,
        }
        for (channel, &weight) in out.channels_mut().iter_mut().zip(&self.spread) {
            for (dst, src) in channel[lo..hi].iter_mut().zip(scratch.iter()) {
                *dst += src * weight;
            }
        }
    }
}

/// Equal-power pan onto channels 0/1; further channels get the centre level.
fn pan_gains(pan: f32, channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
            let mut gains = vec![FRAC_PI_4.cos(); channels];
            gains[0] = angle.cos();
            gains[1] = angle.sin();
            gains
        }
    }
}

/// Offline engine rendering an [`AudioGraph`].
///
/// # Example
///
/// ```rust
/// use cadenza_core::OfflineContext;
/// use cadenza_synth::{SynthEngine, ToneSpec};
/// use futures::executor::block_on;
///
/// let mut ctx = OfflineContext::<SynthEngine>::new(2, 0.1, 48000.0).unwrap();
/// ctx.on_tick(|tick, engine| {
///     if tick.index == 2 {
///         engine.graph_mut().schedule_tone(ToneSpec::new(440.0, tick.time))?;
///     }
///     Ok(())
/// });
/// let buffer = block_on(ctx.render()).unwrap();
/// assert_eq!(buffer.length(), 4800);
/// assert!(buffer.peak() > 0.0);
/// ```
#[derive(Debug)]
pub struct SynthEngine {
    graph: AudioGraph,
    length: usize,
    state: RenderState,
}

impl SynthEngine {
    /// Create an idle engine rendering `length` frames.
    pub fn new(channels: usize, length: usize, sample_rate: f32) -> Result<Self> {
        if channels == 0 {
            return Err(Error::Config("engine needs at least one channel".into()));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::Config(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        Ok(Self {
            graph: AudioGraph::new(channels, sample_rate),
            length,
            state: RenderState::Idle,
        })
    }

    /// Borrow the graph.
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    /// Mutably borrow the graph.
    pub fn graph_mut(&mut self) -> &mut AudioGraph {
        &mut self.graph
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Synthesize the graph into a new buffer.
    fn render_graph(&self) -> AudioBuffer {
        let channels = self.graph.channels();
        let sample_rate = self.graph.sample_rate();
        let mut out = AudioBuffer::new(channels, self.length, sample_rate);

        let mut voices: Vec<Voice> = self
            .graph
            .sources()
            .map(|source| match source {
                Source::Tone(spec) => Voice::tone(spec, sample_rate, channels, self.length),
                Source::Impulse { at, gain } => Voice::impulse(*at, *gain, sample_rate, channels),
            })
            .filter(|voice| voice.start < self.length)
            .collect();
        voices.sort_by_key(|voice| voice.start);

        let gain_frames: Vec<(usize, f32)> = self
            .graph
            .gain_points()
            .iter()
            .map(|p| ((p.time * sample_rate as Seconds).round() as usize, p.gain))
            .collect();
        let mut gain_cursor = 0;
        let mut gain = self.graph.master_gain();

        let mut scratch = vec![0.0f32; RENDER_QUANTUM];
        for from in (0..self.length).step_by(RENDER_QUANTUM) {
            let to = (from + RENDER_QUANTUM).min(self.length);

            for voice in &mut voices {
                if voice.start >= to {
                    break;
                }
                voice.render_into(from, to, &mut out, &mut scratch);
            }

            for frame in from..to {
                while gain_cursor < gain_frames.len() && gain_frames[gain_cursor].0 <= frame {
                    gain = gain_frames[gain_cursor].1;
                    gain_cursor += 1;
                }
                for channel in out.channels_mut() {
                    channel[frame] *= gain;
                }
            }
        }

        out
    }
}

impl RenderingEngine for SynthEngine {
    fn channels(&self) -> usize {
        self.graph.channels()
    }

    fn sample_rate(&self) -> f32 {
        self.graph.sample_rate()
    }
}

impl OfflineEngine for SynthEngine {
    fn with_shape(channels: usize, length: usize, sample_rate: f32) -> Result<Self> {
        Self::new(channels, length, sample_rate)
    }

    fn length(&self) -> usize {
        self.length
    }

    async fn start_rendering(&mut self) -> Result<AudioBuffer> {
        if self.state != RenderState::Idle {
            return Err(Error::InvalidState(format!(
                "engine cannot start rendering while {:?}",
                self.state
            )));
        }
        self.state = RenderState::Rendering;
        tracing::debug!(
            sources = self.graph.len(),
            frames = self.length,
            "synthesizing graph"
        );

        let buffer = self.render_graph();

        self.state = RenderState::Finished;
        tracing::debug!(peak = buffer.peak(), "synthesis finished");
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::Waveform;
    use futures::executor::block_on;

    #[test]
    fn empty_graph_renders_silence() {
        let mut engine = SynthEngine::new(2, 1000, 48000.0).unwrap();
        let buffer = block_on(engine.start_rendering()).unwrap();
        assert_eq!(buffer.length(), 1000);
        assert_eq!(buffer.number_of_channels(), 2);
        assert_eq!(buffer.peak(), 0.0);
        assert_eq!(engine.state(), RenderState::Finished);
    }

    #[test]
    fn second_render_is_invalid_state() {
        let mut engine = SynthEngine::new(1, 10, 48000.0).unwrap();
        block_on(engine.start_rendering()).unwrap();
        assert!(matches!(
            block_on(engine.start_rendering()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn impulse_lands_on_exact_frame() {
        let mut engine = SynthEngine::new(1, 1000, 1000.0).unwrap();
        engine.graph_mut().schedule_impulse(0.3, 0.5).unwrap();
        let buffer = block_on(engine.start_rendering()).unwrap();

        let channel = buffer.channel(0).unwrap();
        assert_eq!(channel[300], 0.5);
        assert_eq!(channel.iter().filter(|s| **s != 0.0).count(), 1);
    }

    #[test]
    fn tone_is_silent_before_start_and_after_release() {
        let mut engine = SynthEngine::new(1, 4800, 48000.0).unwrap();
        let spec = ToneSpec {
            waveform: Waveform::Square,
            stop: Some(0.05),
            release: 0.01,
            ..ToneSpec::new(1000.0, 0.02)
        };
        engine.graph_mut().schedule_tone(spec).unwrap();
        let buffer = block_on(engine.start_rendering()).unwrap();
        let channel = buffer.channel(0).unwrap();

        assert!(channel[..960].iter().all(|s| *s == 0.0));
        assert!(channel[2880..].iter().all(|s| *s == 0.0));
        assert!(channel[1200..2400].iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn sources_past_the_end_are_ignored() {
        let mut engine = SynthEngine::new(1, 100, 1000.0).unwrap();
        engine.graph_mut().schedule_impulse(5.0, 1.0).unwrap();
        let buffer = block_on(engine.start_rendering()).unwrap();
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn gain_automation_applies_from_its_frame() {
        let mut engine = SynthEngine::new(1, 1000, 1000.0).unwrap();
        let graph = engine.graph_mut();
        graph.schedule_impulse(0.1, 1.0).unwrap();
        graph.schedule_impulse(0.6, 1.0).unwrap();
        graph.set_gain_at(0.5, 0.25).unwrap();

        let buffer = block_on(engine.start_rendering()).unwrap();
        let channel = buffer.channel(0).unwrap();
        assert_eq!(channel[100], 1.0);
        assert_eq!(channel[600], 0.25);
    }

    #[test]
    fn hard_pan_routes_to_one_side() {
        let mut engine = SynthEngine::new(2, 480, 48000.0).unwrap();
        let spec = ToneSpec {
            pan: -1.0,
            attack: 0.0,
            ..ToneSpec::new(440.0, 0.0)
        };
        engine.graph_mut().schedule_tone(spec).unwrap();
        let buffer = block_on(engine.start_rendering()).unwrap();

        assert!(buffer.channel(0).unwrap().iter().any(|s| s.abs() > 0.1));
        assert!(buffer.channel(1).unwrap().iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn rejects_bad_shape() {
        assert!(SynthEngine::new(0, 10, 48000.0).is_err());
        assert!(SynthEngine::new(2, 10, -1.0).is_err());
    }

    #[test]
    fn pan_gains_are_equal_power() {
        let centre = pan_gains(0.0, 2);
        let power = centre[0] * centre[0] + centre[1] * centre[1];
        assert!((power - 1.0).abs() < 1e-6);
        assert_eq!(pan_gains(0.3, 1), vec![1.0]);
        assert_eq!(pan_gains(0.0, 4).len(), 4);
    }
}
