//! WAV file I/O for cadenza render output.
//!
//! [`write_wav`] stores an [`AudioBuffer`](cadenza_core::AudioBuffer) as an
//! interleaved WAV file; [`read_wav`] loads one back with every channel kept
//! separate. [`read_wav_info`] reads the header only.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadenza_io::{read_wav, write_wav};
//!
//! let buffer = block_on(ctx.render())?;
//! write_wav("render.wav", &buffer, 24)?;
//!
//! let loaded = read_wav("render.wav")?;
//! assert_eq!(loaded.length(), buffer.length());
//! ```

mod wav;

pub use wav::{WavFormat, WavInfo, read_wav, read_wav_info, write_wav};

/// Error types for WAV I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The buffer cannot be represented as a WAV file.
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for WAV I/O.
pub type Result<T> = std::result::Result<T, Error>;
