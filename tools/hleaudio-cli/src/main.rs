//! HLE audio CLI - drive the audio core without an emulator
//!
//! # Commands
//!
//! - `hleaudio render` - Render the scripted voice scenario to a WAV file
//! - `hleaudio play` - Stream the scenario to the default output device
//!   (requires the `host-output` feature)
//! - `hleaudio state` - Write or inspect an audio save state
//! - `hleaudio config` - Print or write the default audio.toml
//!
//! # Usage
//!
//! ```bash
//! # Two seconds at low latency
//! hleaudio render --frames 88200 --latency low --out tones.wav
//!
//! # Snapshot the engine after half a second, then look inside
//! hleaudio state --out audio.state --frames 22050
//! hleaudio state --inspect audio.state
//! ```

mod config;
#[cfg(feature = "host-output")]
mod play;
mod render;
mod scenario;
mod state;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hleaudio_core::{AudioConfig, AudioSettings, LatencyProfile};

/// HLE audio CLI - drive the audio core without an emulator
#[derive(Parser)]
#[command(name = "hleaudio")]
#[command(about = "Render, play and inspect the emulated audio mixer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the scripted voice scenario to a WAV file
    Render(render::RenderArgs),

    /// Stream the scenario to the default output device
    #[cfg(feature = "host-output")]
    Play(play::PlayArgs),

    /// Write or inspect an audio save state
    State(state::StateArgs),

    /// Print or write the default audio configuration
    Config(config::ConfigArgs),
}

/// Options shared by commands that build an engine
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Path to audio.toml (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// Override the latency profile (low, medium, high)
    #[arg(short, long, value_parser = parse_latency)]
    pub latency: Option<LatencyProfile>,
}

impl EngineArgs {
    /// Load the config file, apply overrides and derive engine settings.
    pub fn settings(&self) -> Result<AudioSettings> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AudioConfig::default(),
        };
        if let Some(latency) = self.latency {
            config.latency = latency;
        }
        config.settings().context("invalid audio configuration")
    }
}

fn load_config(path: &Path) -> Result<AudioConfig> {
    AudioConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}

fn parse_latency(value: &str) -> Result<LatencyProfile, String> {
    LatencyProfile::parse(value).ok_or_else(|| {
        format!(
            "unknown latency profile '{}' (expected low, medium or high)",
            value
        )
    })
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => render::execute(args),
        #[cfg(feature = "host-output")]
        Commands::Play(args) => play::execute(args),
        Commands::State(args) => state::execute(args),
        Commands::Config(args) => config::execute(args),
    }
}
