//! Audio-rate oscillators with anti-aliasing.
//!
//! Band-limited oscillators for tone sources, using PolyBLEP
//! (Polynomial Band-Limited Step) to reduce aliasing artifacts.

use std::f32::consts::PI;

/// Euclidean remainder for f32 in `[0, b)`.
#[inline]
fn rem_euclid_f32(a: f32, b: f32) -> f32 {
    let r = a - b * (a / b).floor();
    if r < 0.0 { r + b } else { r }
}

/// Oscillator waveform types
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Waveform {
    /// Sine waveform, pure fundamental.
    #[default]
    Sine,
    /// Triangle waveform, odd harmonics.
    Triangle,
    /// Sawtooth waveform, all harmonics.
    Saw,
    /// Square waveform (50% duty cycle).
    Square,
    /// Pulse with variable duty cycle (0.0 to 1.0)
    Pulse(f32),
    /// White noise
    Noise,
}

/// Audio-rate oscillator with PolyBLEP anti-aliasing.
///
/// # Example
///
/// ```rust
/// use cadenza_synth::{Oscillator, Waveform};
///
/// let mut osc = Oscillator::new(48000.0);
/// osc.set_frequency(440.0);
/// osc.set_waveform(Waveform::Saw);
///
/// let sample = osc.advance();
/// assert!(sample.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    waveform: Waveform,
    /// Xorshift state for noise
    noise_state: u32,
    /// Previous output for triangle integration
    prev_output: f32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// Create a new 440 Hz sine oscillator at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            frequency: 440.0,
            waveform: Waveform::Sine,
            noise_state: 0x12345678,
            prev_output: 0.0,
        }
    }

    /// Set frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = freq_hz.max(0.0);
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Get current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set waveform type.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Seed the noise generator. Zero is replaced by the default seed.
    pub fn set_noise_seed(&mut self, seed: u32) {
        self.noise_state = if seed == 0 { 0x12345678 } else { seed };
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.prev_output = 0.0;
    }

    /// Generate next sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let output = self.generate_sample(self.phase, self.phase_inc);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        output
    }

    /// Fill `out` with consecutive samples.
    pub fn fill(&mut self, out: &mut [f32]) {
        for sample in out {
            *sample = self.advance();
        }
    }

    /// Generate a sample at `phase` with PolyBLEP window width `dt`.
    ///
    /// - **Sine**: no aliasing possible, computed directly.
    /// - **Saw**: naive ramp with PolyBLEP at the phase wrap.
    /// - **Square/Pulse**: PolyBLEP at both edges.
    /// - **Triangle**: leaky integration of a PolyBLEP square; the
    ///   discontinuity is in the slope, so integrating a corrected square
    ///   beats correcting a naive triangle.
    /// - **Noise**: xorshift32.
    #[inline]
    fn generate_sample(&mut self, phase: f32, dt: f32) -> f32 {
        match self.waveform {
            Waveform::Sine => (phase * 2.0 * PI).sin(),

            Waveform::Saw => {
                let naive = 2.0 * phase - 1.0;
                naive - poly_blep(phase, dt)
            }

            Waveform::Square => generate_pulse(phase, 0.5, dt),

            Waveform::Pulse(duty) => generate_pulse(phase, duty.clamp(0.01, 0.99), dt),

            Waveform::Triangle => {
                let square = if phase < 0.5 { 1.0 } else { -1.0 };
                let blep_square =
                    square + poly_blep(phase, dt) - poly_blep(rem_euclid_f32(phase + 0.5, 1.0), dt);

                // Clamped at 0.9 so very high frequencies cannot run away.
                let leak = 1.0 - (self.frequency / self.sample_rate).min(0.1);
                self.prev_output = leak * self.prev_output + blep_square * dt * 4.0;
                self.prev_output
            }

            Waveform::Noise => self.generate_noise(),
        }
    }

    #[inline]
    fn generate_noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;

        (x as i32 as f32) / (i32::MAX as f32)
    }
}

#[inline]
fn generate_pulse(phase: f32, duty: f32, dt: f32) -> f32 {
    let naive = if phase < duty { 1.0 } else { -1.0 };
    // Rising edge at 0, falling edge at duty.
    let rising = poly_blep(phase, dt);
    let falling = poly_blep(rem_euclid_f32(phase - duty + 1.0, 1.0), dt);
    naive + rising - falling
}

/// 4th-order PolyBLEP correction.
///
/// C²-continuous piecewise polynomial spanning two samples either side of a
/// discontinuity (roughly 50 dB of alias suppression).
///
/// Reference: Välimäki et al., "Antialiasing Oscillators", IEEE Signal
/// Processing Magazine, 2010.
///
/// # Arguments
/// * `t` - Current phase position in [0.0, 1.0)
/// * `dt` - Phase increment per sample (frequency / sample_rate)
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    //   p₁(n) = A₄·n⁴ + A₃·n³ + A₂·n² + A₀  for n ∈ [0,1)
    //   p₂(n) = C·(2-n)⁴                     for n ∈ [1,2)
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    let segment = |n: f32| {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    };

    let dt2 = 2.0 * dt;
    if t < dt2 {
        segment(t / dt)
    } else if t > 1.0 - dt2 {
        -segment((1.0 - t) / dt)
    } else {
        0.0
    }
}
