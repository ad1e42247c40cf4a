//! Cadenza CLI - render scheduled jobs offline and inspect the results.

mod commands;
mod job;
mod sequencer;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadenza")]
#[command(author, version, about = "Cadenza offline renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a job file to WAV on the virtual clock
    Render(commands::render::RenderArgs),

    /// Show WAV file information
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
