//! Cadence CLI - render and play Cadence tracker songs.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Cadence tracker renderer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a song to a WAV file
    Render(commands::render::RenderArgs),

    /// Play a song through the default (or named) audio device
    Play(commands::play::PlayArgs),

    /// Print summary information about a song
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
