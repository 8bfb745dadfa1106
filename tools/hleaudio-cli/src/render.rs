//! Render command - scenario to WAV

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use hleaudio_core::HW_SAMPLE_RATE;
use tracing::info;

use crate::EngineArgs;
use crate::scenario::Scenario;

/// Arguments for the render command
#[derive(Args)]
pub struct RenderArgs {
    /// Number of stereo frames to render
    #[arg(short, long, default_value = "88200")]
    pub frames: usize,

    /// Output WAV file
    #[arg(short, long, default_value = "hleaudio.wav")]
    pub out: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let mut scenario = Scenario::new(args.engine.settings()?)?;
    let samples = scenario.render(args.frames)?;
    write_wav(&args.out, &samples)?;

    let stats = scenario.engine().mixer_stats();
    info!(
        "Rendered {} frames to {} ({} ticks, {} blocks discarded)",
        args.frames,
        args.out.display(),
        stats.ticks,
        stats.blocks_discarded
    );
    Ok(())
}

/// Write interleaved stereo samples as 16-bit PCM at the hardware rate.
pub fn write_wav(path: &Path, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: HW_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize().context("failed to finalize WAV file")?;
    Ok(())
}
