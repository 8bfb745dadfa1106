//! Play command - stream the scenario to the default output device

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hleaudio_core::{HW_SAMPLE_RATE, OutputPuller};
use tracing::{debug, error, info, warn};

use crate::EngineArgs;
use crate::scenario::Scenario;

/// Frames the mixer may run ahead of the wall clock
const LEAD_FRAMES: u64 = 2048;

/// Arguments for the play command
#[derive(Args)]
pub struct PlayArgs {
    /// Seconds of audio to play
    #[arg(short, long, default_value = "3.0")]
    pub seconds: f32,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Execute the play command
pub fn execute(args: PlayArgs) -> Result<()> {
    let settings = args.engine.settings()?;
    let mut scenario = Scenario::new(settings)?;
    let puller = scenario.output();

    let stream = open_stream(puller.clone())?;
    stream.play().context("failed to start audio stream")?;

    let start = Instant::now();
    let duration = Duration::from_secs_f32(args.seconds.max(0.0));
    let block = settings.hw_block_size as u64;
    while start.elapsed() < duration {
        let played = (start.elapsed().as_secs_f64() * HW_SAMPLE_RATE as f64) as u64;
        let mixed = scenario.engine().mixer_stats().ticks * block;
        if mixed > played + LEAD_FRAMES {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }
        scenario.step()?;
    }
    drop(stream);

    let stats = puller.stats();
    let mixer = scenario.engine().mixer_stats();
    info!(
        "Played {:.1}s: {} ticks, {} pulls, {} underruns, {} blocks discarded",
        args.seconds, mixer.ticks, stats.pulls, stats.underruns, mixer.blocks_discarded
    );
    Ok(())
}

fn open_stream(puller: OutputPuller) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No audio output device available"))?;
    let config = device
        .default_output_config()
        .context("failed to get default output config")?;

    let sample_rate = config.sample_rate().0;
    if sample_rate != HW_SAMPLE_RATE {
        warn!(
            "Output device runs at {}Hz; mixer output is {}Hz and will play at the wrong pitch",
            sample_rate, HW_SAMPLE_RATE
        );
    }
    let channels = config.channels() as usize;

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream(&device, &config.into(), channels, puller, |s| {
            s as f32 / 32768.0
        })?,
        cpal::SampleFormat::I16 => build_stream(&device, &config.into(), channels, puller, |s| s)?,
        cpal::SampleFormat::U16 => build_stream(&device, &config.into(), channels, puller, |s| {
            (s as i32 + 32768) as u16
        })?,
        format => bail!("Unsupported sample format: {:?}", format),
    };

    debug!("Audio stream opened at {}Hz with {} channels", sample_rate, channels);
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    puller: OutputPuller,
    convert: fn(i16) -> T,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + Send + 'static,
{
    let mut scratch: Vec<i16> = vec![0; 4096];
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                if scratch.len() < frames * 2 {
                    scratch.resize(frames * 2, 0);
                }
                let stereo = &mut scratch[..frames * 2];
                puller.pull(stereo);
                spread_frames(stereo, data, channels, convert);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .context("failed to build audio stream")?;
    Ok(stream)
}

/// Map interleaved stereo onto a device buffer with `channels` channels.
fn spread_frames<T>(stereo: &[i16], data: &mut [T], channels: usize, convert: fn(i16) -> T) {
    if channels == 0 {
        return;
    }
    for (frame, out) in stereo.chunks_exact(2).zip(data.chunks_exact_mut(channels)) {
        if channels == 1 {
            out[0] = convert(((frame[0] as i32 + frame[1] as i32) / 2) as i16);
            continue;
        }
        out[0] = convert(frame[0]);
        out[1] = convert(frame[1]);
        for extra in &mut out[2..] {
            *extra = convert(0);
        }
    }
}
