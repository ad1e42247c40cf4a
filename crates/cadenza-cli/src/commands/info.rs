//! Inspect a rendered WAV against the offline tick grid.

use super::dbfs;
use cadenza_core::{RENDER_QUANTUM, Seconds, TICK_STEP, TIME_EPSILON};
use cadenza_io::{WavFormat, read_wav, read_wav_info};
use clap::Args;
use std::path::PathBuf;

/// Samples at or below this level count as silence when looking for onsets.
const SILENCE: f32 = 1e-4;

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the WAV file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.file)?;
    let buffer = read_wav(&args.file)?;

    let encoding = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "float",
    };

    println!("{}", args.file.display());
    println!(
        "  Format:  {} Hz, {} ch, {encoding} {}-bit",
        info.sample_rate, info.channels, info.bits_per_sample
    );
    println!(
        "  Length:  {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );
    println!(
        "  Ticks:   {} at {:.0} ms",
        tick_count(info.duration_secs),
        TICK_STEP * 1000.0
    );
    println!(
        "  Quanta:  {} x {RENDER_QUANTUM} frames",
        info.num_frames.div_ceil(RENDER_QUANTUM as u64)
    );
    println!("  Peak:    {}", dbfs(buffer.peak()));

    for (index, channel) in buffer.channels().iter().enumerate() {
        let peak = channel.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        let onset = match channel.iter().position(|s| s.abs() > SILENCE) {
            Some(frame) => {
                let time = frame as Seconds / f64::from(info.sample_rate);
                format!("onset {time:.4}s (tick {})", tick_count(time) - 1)
            }
            None => "silent".to_string(),
        };
        println!("  [{index}]     {}, {onset}", dbfs(peak));
    }

    Ok(())
}

/// Ticks an offline render of `duration` emits, counting the one at zero.
fn tick_count(duration: Seconds) -> u64 {
    ((duration + TIME_EPSILON) / TICK_STEP).floor() as u64 + 1
}
