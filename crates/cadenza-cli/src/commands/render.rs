//! Offline render of a job file to WAV.

use super::dbfs;
use crate::job::JobConfig;
use crate::sequencer::Sequencer;
use cadenza_core::OfflineContext;
use cadenza_io::write_wav;
use cadenza_synth::SynthEngine;
use clap::Args;
use futures::executor::block_on;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Job file (TOML)
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Output WAV file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32", value_parser = parse_bits)]
    bits: u16,
}

fn parse_bits(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(bits @ (16 | 24 | 32)) => Ok(bits),
        _ => Err(format!("Invalid bit depth: '{s}' (expected 16, 24 or 32)")),
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let job = JobConfig::load(&args.job)?;
    println!("Rendering {}...", args.job.display());
    println!(
        "  {} notes, {} gain points, {:.3}s at {} Hz",
        job.notes.len(),
        job.gains.len(),
        job.duration,
        job.sample_rate
    );

    let mut ctx = OfflineContext::<SynthEngine>::new(
        usize::from(job.channels),
        job.duration,
        job.sample_rate as f32,
    )?;
    ctx.engine_mut().graph_mut().set_master_gain(job.master_gain);

    let mut sequencer = Sequencer::new(job.tones(), job.look_ahead);
    ctx.on_tick(move |tick, engine| sequencer.on_tick(tick, engine));

    // Automation is placed one look-ahead early and lands at its exact time.
    for (time, gain) in job.gain_points() {
        ctx.set_timeout(
            move |_, engine| {
                engine.graph_mut().set_gain_at(time, gain)?;
                Ok(())
            },
            (time - job.look_ahead).max(0.0),
        )?;
    }

    let buffer = block_on(ctx.render())?;
    write_wav(&args.output, &buffer, args.bits)?;

    println!("Wrote {}", args.output.display());
    println!("  Ticks:   {}", ctx.ticks_emitted());
    println!("  Frames:  {} ({:.3}s)", buffer.length(), buffer.duration());
    println!("  Sources: {}", ctx.engine().graph().len());
    println!("  Peak:    {}", dbfs(buffer.peak()));

    Ok(())
}
