//! Rendered audio buffers.
//!
//! [`AudioBuffer`] is the product of an offline render: one `Vec<f32>` per
//! channel (planar layout), all of equal length, tagged with the sample rate
//! they were rendered at. Conversions to and from interleaved data are
//! provided for file writers.

use crate::clock::Seconds;

/// Planar multi-channel audio with a fixed sample rate.
///
/// # Example
///
/// ```rust
/// use cadenza_core::AudioBuffer;
///
/// let buffer = AudioBuffer::new(2, 44100, 44100.0);
/// assert_eq!(buffer.number_of_channels(), 2);
/// assert_eq!(buffer.length(), 44100);
/// assert!((buffer.duration() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: f32,
}

impl AudioBuffer {
    /// Creates a silent buffer with `channels` channels of `length` frames.
    pub fn new(channels: usize, length: usize, sample_rate: f32) -> Self {
        Self {
            channels: (0..channels).map(|_| vec![0.0; length]).collect(),
            sample_rate,
        }
    }

    /// Wraps existing channel data.
    ///
    /// All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: f32) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "Channels must have same length"
        );
        Self {
            channels,
            sample_rate,
        }
    }

    /// Builds a buffer from interleaved frames (L, R, L, R, ...).
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(data: &[f32], channels: usize, sample_rate: f32) -> Self {
        if channels == 0 {
            return Self::from_channels(Vec::new(), sample_rate);
        }
        let length = data.len() / channels;
        let mut planar: Vec<Vec<f32>> = (0..channels).map(|_| Vec::with_capacity(length)).collect();
        for frame in data.chunks_exact(channels) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::from_channels(planar, sample_rate)
    }

    /// Number of channels.
    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames per channel.
    pub fn length(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> Seconds {
        self.length() as Seconds / self.sample_rate as Seconds
    }

    /// Frame index closest to `time`, clamped to zero for negative times.
    pub fn frame_at(&self, time: Seconds) -> usize {
        (time * self.sample_rate as Seconds).round().max(0.0) as usize
    }

    /// Borrow one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Mutably borrow one channel.
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    /// Borrow all channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Mutably borrow all channels.
    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    /// Consume the buffer, returning its channel data.
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Convert to interleaved format (L, R, L, R, ...).
    pub fn to_interleaved(&self) -> Vec<f32> {
        let length = self.length();
        let mut interleaved = Vec::with_capacity(length * self.channels.len());
        for frame in 0..length {
            for channel in &self.channels {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }
}
