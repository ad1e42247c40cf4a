//! WAV file reading and writing.

use crate::{Error, Result};
use cadenza_core::AudioBuffer;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
    /// Size of the file on disk in bytes.
    pub file_size: u64,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let path = path.as_ref();
    let file_size = std::fs::metadata(path)?.len();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len()); // across all channels
    let num_frames = total_samples / u64::from(spec.channels);
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
        file_size,
    })
}

/// Read a WAV file into a planar buffer, one channel per file channel.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        &samples,
        usize::from(spec.channels),
        spec.sample_rate as f32,
    ))
}

/// Write a buffer to an interleaved WAV file.
///
/// 32 bits writes IEEE float samples; 16 and 24 bits write integer PCM,
/// clamping samples outside `[-1.0, 1.0)`.
///
/// # Example
/// ```ignore
/// let buffer = AudioBuffer::new(2, 48000, 48000.0); // 1 second of silence
/// write_wav("output.wav", &buffer, 16)?;
/// ```
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    buffer: &AudioBuffer,
    bits_per_sample: u16,
) -> Result<()> {
    let sample_format = match bits_per_sample {
        32 => SampleFormat::Float,
        16 | 24 => SampleFormat::Int,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "{other}-bit output (expected 16, 24 or 32)"
            )));
        }
    };
    let channels = u16::try_from(buffer.number_of_channels())
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| {
            Error::InvalidBuffer(format!(
                "cannot store {} channels",
                buffer.number_of_channels()
            ))
        })?;

    let spec = hound::WavSpec {
        channels,
        sample_rate: buffer.sample_rate().round() as u32,
        bits_per_sample,
        sample_format,
    };
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, spec)?;

    let interleaved = buffer.to_interleaved();
    if sample_format == SampleFormat::Float {
        for &sample in &interleaved {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        for &sample in &interleaved {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    tracing::info!(
        path = %path.display(),
        channels,
        frames = buffer.length(),
        bits = bits_per_sample,
        "wrote WAV file"
    );
    Ok(())
}
