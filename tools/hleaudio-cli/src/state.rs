//! State command - write or inspect audio save states

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use hleaudio_core::{AudioStateImage, AudioStateSnapshot};
use tracing::info;

use crate::EngineArgs;
use crate::scenario::Scenario;

/// Arguments for the state command
#[derive(Args)]
pub struct StateArgs {
    /// Render the scenario and write a save state here
    #[arg(short, long, conflicts_with = "inspect")]
    pub out: Option<PathBuf>,

    /// Print a summary of an existing save state
    #[arg(short, long)]
    pub inspect: Option<PathBuf>,

    /// Frames to render before taking the snapshot
    #[arg(short, long, default_value = "4410")]
    pub frames: usize,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Execute the state command
pub fn execute(args: StateArgs) -> Result<()> {
    match (&args.out, &args.inspect) {
        (Some(out), None) => write_state(out, args.frames, &args.engine),
        (None, Some(path)) => {
            print!("{}", inspect(path)?);
            Ok(())
        }
        _ => bail!("pass either --out <file> or --inspect <file>"),
    }
}

fn write_state(path: &Path, frames: usize, engine: &EngineArgs) -> Result<()> {
    let mut scenario = Scenario::new(engine.settings()?)?;
    scenario.render(frames)?;
    let snapshot = scenario.engine().save_state();
    std::fs::write(path, snapshot.to_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} byte audio state to {}", snapshot.len(), path.display());
    Ok(())
}

fn inspect(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = AudioStateSnapshot::from_bytes(&bytes)?;
    let image = snapshot
        .image()
        .with_context(|| format!("{} is not a valid audio state", path.display()))?;
    Ok(summarize(&snapshot, &image))
}

fn summarize(snapshot: &AudioStateSnapshot, image: &AudioStateImage) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "checksum:       {:016x}", snapshot.checksum);
    let _ = writeln!(out, "update event:   {}", image.update_event.0);
    let _ = writeln!(out, "host event:     {}", image.host_event.0);
    let _ = writeln!(out, "mix frequency:  {} Hz", image.mix_frequency);
    let _ = writeln!(out, "master queue:   {} samples", image.master.len());
    let _ = writeln!(out, "channels:       {}", image.channels.len());
    for (index, channel) in image.channels.iter().enumerate() {
        if !channel.reserved && channel.queue.is_empty() && channel.waiting.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "  [{}] {} {:?} addr={:#010x} count={} vol=({:#06x}, {:#06x}) queued={} waiting={}",
            index,
            if channel.reserved { "reserved" } else { "free    " },
            channel.format,
            channel.sample_address,
            channel.sample_count,
            channel.left_volume,
            channel.right_volume,
            channel.queue.len(),
            channel.waiting.len()
        );
    }
    out
}
