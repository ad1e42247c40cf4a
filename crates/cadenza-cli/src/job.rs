//! Render job file format.
//!
//! A job describes the output shape, a tempo, a list of notes and optional
//! master gain automation. Note and gain times are given either in seconds
//! (`at`) or in beats (`beat`), converted with the job's `bpm`.
//!
//! ```toml
//! sample_rate = 48000
//! channels = 2
//! duration = 2.0
//! bpm = 120.0
//!
//! [[note]]
//! beat = 0.0
//! beats = 1.0
//! midi = 60
//! waveform = "saw"
//!
//! [[note]]
//! at = 0.5
//! length = 0.25
//! frequency = 440.0
//! pan = 0.5
//!
//! [[gain]]
//! beat = 2.0
//! gain = 0.5
//! ```

use cadenza_synth::{ToneSpec, Waveform};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Failed to read the job file
    #[error("failed to read job '{path}': {source}")]
    ReadFile {
        /// Path of the job file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse job: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A field holds an unusable value
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl JobError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        JobError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Oscillator shape of a note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteWaveform {
    /// Sine wave.
    #[default]
    Sine,
    /// Triangle wave.
    Triangle,
    /// Sawtooth wave.
    Saw,
    /// Square wave.
    Square,
    /// Pulse wave; duty cycle set by the note's `duty`.
    Pulse,
    /// White noise.
    Noise,
}

/// One `[[note]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteEvent {
    /// Start in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<f64>,
    /// Start in beats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat: Option<f64>,
    /// Held length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    /// Held length in beats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beats: Option<f64>,
    /// Pitch in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f32>,
    /// Pitch as a MIDI note number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midi: Option<u8>,
    /// Oscillator shape.
    #[serde(default)]
    pub waveform: NoteWaveform,
    /// Pulse duty cycle.
    #[serde(default = "default_duty")]
    pub duty: f32,
    /// Linear gain.
    #[serde(default = "default_note_gain")]
    pub gain: f32,
    /// Stereo position, -1.0 to 1.0.
    #[serde(default)]
    pub pan: f32,
    /// Fade-in in seconds.
    #[serde(default = "default_attack")]
    pub attack: f64,
    /// Fade-out in seconds.
    #[serde(default = "default_release")]
    pub release: f64,
}

/// One `[[gain]]` automation point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GainEvent {
    /// Time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<f64>,
    /// Time in beats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat: Option<f64>,
    /// Linear master gain from this point on.
    pub gain: f32,
}

/// A render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Output channel count.
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Render length in seconds.
    pub duration: f64,
    /// Tempo used to convert beats to seconds.
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    /// How far ahead of the clock notes are placed into the graph.
    #[serde(default = "default_look_ahead")]
    pub look_ahead: f64,
    /// Master gain before any automation point.
    #[serde(default = "default_master_gain")]
    pub master_gain: f32,
    /// Notes to play.
    #[serde(default, rename = "note")]
    pub notes: Vec<NoteEvent>,
    /// Master gain automation.
    #[serde(default, rename = "gain")]
    pub gains: Vec<GainEvent>,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channels() -> u16 {
    2
}

fn default_bpm() -> f64 {
    120.0
}

fn default_look_ahead() -> f64 {
    0.1
}

fn default_master_gain() -> f32 {
    1.0
}

fn default_note_gain() -> f32 {
    0.5
}

fn default_duty() -> f32 {
    0.5
}

fn default_attack() -> f64 {
    0.005
}

fn default_release() -> f64 {
    0.01
}

impl JobConfig {
    /// Load and validate a job file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| JobError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a job from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, JobError> {
        let job: JobConfig = toml::from_str(toml_str)?;
        job.validate()?;
        Ok(job)
    }

    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.sample_rate == 0 {
            return Err(JobError::invalid("sample_rate", "must be positive"));
        }
        if self.channels == 0 {
            return Err(JobError::invalid("channels", "must be at least 1"));
        }
        non_negative("duration", self.duration)?;
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(JobError::invalid(
                "bpm",
                format!("must be positive, got {}", self.bpm),
            ));
        }
        if !(self.look_ahead.is_finite() && self.look_ahead > 0.0) {
            return Err(JobError::invalid(
                "look_ahead",
                format!("must be positive, got {}", self.look_ahead),
            ));
        }
        if !self.master_gain.is_finite() {
            return Err(JobError::invalid("master_gain", "must be finite"));
        }

        for (i, note) in self.notes.iter().enumerate() {
            note.validate(&format!("note[{i}]"))?;
        }
        for (i, point) in self.gains.iter().enumerate() {
            let field = format!("gain[{i}]");
            one_time(&field, point.at, point.beat)?;
            if !point.gain.is_finite() {
                return Err(JobError::invalid(format!("{field}.gain"), "must be finite"));
            }
        }
        Ok(())
    }

    /// Seconds per beat at the job's tempo.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Resolve a seconds-or-beats pair to seconds.
    fn seconds(&self, at: Option<f64>, beat: Option<f64>) -> f64 {
        at.or_else(|| beat.map(|b| b * self.seconds_per_beat()))
            .unwrap_or(0.0)
    }

    /// Notes as tone parameters in seconds, sorted by start time.
    pub fn tones(&self) -> Vec<ToneSpec> {
        let mut tones: Vec<ToneSpec> = self
            .notes
            .iter()
            .map(|note| {
                let start = self.seconds(note.at, note.beat);
                let held = match (note.length, note.beats) {
                    (None, None) => None,
                    (length, beats) => Some(self.seconds(length, beats)),
                };
                ToneSpec {
                    frequency: note.pitch(),
                    waveform: note.waveform(),
                    gain: note.gain,
                    pan: note.pan,
                    start,
                    stop: held.map(|h| start + h),
                    attack: note.attack,
                    release: note.release,
                }
            })
            .collect();
        tones.sort_by(|a, b| a.start.total_cmp(&b.start));
        tones
    }

    /// Gain automation as `(seconds, gain)` pairs in file order.
    pub fn gain_points(&self) -> Vec<(f64, f32)> {
        self.gains
            .iter()
            .map(|point| (self.seconds(point.at, point.beat), point.gain))
            .collect()
    }
}

impl NoteEvent {
    fn validate(&self, field: &str) -> Result<(), JobError> {
        one_time(field, self.at, self.beat)?;
        if self.length.is_some() && self.beats.is_some() {
            return Err(JobError::invalid(
                field,
                "set only one of `length` and `beats`",
            ));
        }
        if let Some(length) = self.length.or(self.beats) {
            non_negative(&format!("{field}.length"), length)?;
        }

        match (self.frequency, self.midi) {
            (Some(_), Some(_)) => {
                return Err(JobError::invalid(
                    field,
                    "set only one of `frequency` and `midi`",
                ));
            }
            (None, None) => {
                return Err(JobError::invalid(field, "needs `frequency` or `midi`"));
            }
            (Some(freq), None) if !(freq.is_finite() && freq > 0.0) => {
                return Err(JobError::invalid(
                    format!("{field}.frequency"),
                    format!("must be positive, got {freq}"),
                ));
            }
            (None, Some(midi)) if midi > 127 => {
                return Err(JobError::invalid(
                    format!("{field}.midi"),
                    format!("must be 0-127, got {midi}"),
                ));
            }
            _ => {}
        }

        if !(0.0..=1.0).contains(&self.duty) {
            return Err(JobError::invalid(
                format!("{field}.duty"),
                "must be in [0, 1]",
            ));
        }
        if !self.gain.is_finite() {
            return Err(JobError::invalid(format!("{field}.gain"), "must be finite"));
        }
        if !(-1.0..=1.0).contains(&self.pan) {
            return Err(JobError::invalid(
                format!("{field}.pan"),
                "must be in [-1, 1]",
            ));
        }
        non_negative(&format!("{field}.attack"), self.attack)?;
        non_negative(&format!("{field}.release"), self.release)
    }

    fn pitch(&self) -> f32 {
        match (self.frequency, self.midi) {
            (Some(freq), _) => freq,
            (None, Some(midi)) => midi_to_freq(midi),
            (None, None) => 0.0,
        }
    }

    fn waveform(&self) -> Waveform {
        match self.waveform {
            NoteWaveform::Sine => Waveform::Sine,
            NoteWaveform::Triangle => Waveform::Triangle,
            NoteWaveform::Saw => Waveform::Saw,
            NoteWaveform::Square => Waveform::Square,
            NoteWaveform::Pulse => Waveform::Pulse(self.duty),
            NoteWaveform::Noise => Waveform::Noise,
        }
    }
}

/// Convert MIDI note number to frequency in Hz (A4 = 69 = 440 Hz).
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((f32::from(note) - 69.0) / 12.0)
}

fn one_time(field: &str, at: Option<f64>, beat: Option<f64>) -> Result<(), JobError> {
    match (at, beat) {
        (Some(_), Some(_)) => Err(JobError::invalid(field, "set only one of `at` and `beat`")),
        (None, None) => Err(JobError::invalid(field, "needs `at` or `beat`")),
        (Some(t), None) | (None, Some(t)) => non_negative(&format!("{field}.time"), t),
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), JobError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(JobError::invalid(
            field,
            format!("must be a non-negative number, got {value}"),
        ))
    }
}
