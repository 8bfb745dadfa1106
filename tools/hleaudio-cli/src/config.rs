//! Config command - print or write audio.toml

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hleaudio_core::AudioConfig;
use tracing::info;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default configuration to this path instead of printing it
    #[arg(short, long)]
    pub write: Option<PathBuf>,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    let config = AudioConfig::default();
    match args.write {
        Some(path) => {
            config
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote default audio config to {}", path.display());
        }
        None => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}
