//! Scripted voice scenario
//!
//! Three virtual threads each feed one channel with a sine tone using
//! blocking enqueues, the way a guest audio thread would. The headless clock
//! drives the mix tick; rendered audio is pulled from the master queue.

use anyhow::{Context, Result, bail};
use hleaudio_core::headless::{FlatMemory, HeadlessClock, HeadlessScheduler, NullHost};
use hleaudio_core::{
    AudioEngine, AudioSettings, ChannelId, EnqueueResult, OutputPuller, SampleFormat, ThreadId,
};
use tracing::debug;

const RAM_BASE: u32 = 0x0880_0000;
const RAM_SIZE: usize = 0x4_0000;

/// Frames submitted per enqueue
const VOICE_BLOCK_FRAMES: u32 = 256;

struct Voice {
    thread: ThreadId,
    channel: usize,
    format: SampleFormat,
    frequency: f32,
    amplitude: f32,
    address: u32,
    phase: f32,
}

impl Voice {
    /// Write the next block of the tone into guest memory.
    fn render_block(&mut self, memory: &mut FlatMemory) -> bool {
        let step = self.frequency * std::f32::consts::TAU / hleaudio_core::HW_SAMPLE_RATE as f32;
        let per_frame = self.format.samples_per_frame();
        let mut samples = Vec::with_capacity(VOICE_BLOCK_FRAMES as usize * per_frame);
        for _ in 0..VOICE_BLOCK_FRAMES {
            let value = (self.phase.sin() * self.amplitude * i16::MAX as f32) as i16;
            samples.extend(std::iter::repeat_n(value, per_frame));
            self.phase = (self.phase + step) % std::f32::consts::TAU;
        }
        memory.write_samples(self.address, &samples)
    }
}

/// Engine plus headless collaborators running a fixed set of voices.
pub struct Scenario {
    engine: AudioEngine,
    scheduler: HeadlessScheduler,
    clock: HeadlessClock,
    memory: FlatMemory,
    host: NullHost,
    voices: Vec<Voice>,
    submitted_blocks: u64,
}

impl Scenario {
    pub fn new(settings: AudioSettings) -> Result<Self> {
        let mut clock = HeadlessClock::default();
        let mut engine = AudioEngine::new(settings, &mut clock);
        let mut scheduler = HeadlessScheduler::new();

        // (channel, format, frequency, amplitude, left volume, right volume)
        let script = [
            (0, SampleFormat::Stereo, 440.0, 0.25, 0x8000, 0x8000),
            (1, SampleFormat::Stereo, 660.0, 0.25, 0x4000, 0x6000),
            (2, SampleFormat::Mono, 220.0, 0.3, 0x7000, 0x2000),
        ];

        let mut voices = Vec::new();
        for (i, (channel, format, frequency, amplitude, left, right)) in
            script.into_iter().enumerate()
        {
            engine
                .reserve_channel(channel, VOICE_BLOCK_FRAMES, format)
                .with_context(|| format!("failed to reserve channel {}", channel))?;
            let address = RAM_BASE + i as u32 * 0x1000;
            let state = engine
                .channel_mut(channel)
                .context("reserved channel disappeared")?;
            state.sample_address = address;
            state.set_volume(left, right);

            voices.push(Voice {
                thread: scheduler.spawn_thread(&format!("voice{}", channel)),
                channel,
                format,
                frequency,
                amplitude,
                address,
                phase: 0.0,
            });
        }

        Ok(Self {
            engine,
            scheduler,
            clock,
            memory: FlatMemory::new(RAM_BASE, RAM_SIZE),
            host: NullHost,
            voices,
            submitted_blocks: 0,
        })
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn output(&self) -> OutputPuller {
        self.engine.output()
    }

    pub fn submitted_blocks(&self) -> u64 {
        self.submitted_blocks
    }

    /// Let every runnable voice submit, then advance the clock by one mix
    /// tick interval.
    pub fn step(&mut self) -> Result<()> {
        for voice in &mut self.voices {
            if self.scheduler.is_waiting(voice.thread) {
                continue;
            }
            if !voice.render_block(&mut self.memory) {
                bail!("voice buffer for channel {} is outside guest memory", voice.channel);
            }
            self.scheduler.set_current(voice.thread);
            let result = self
                .engine
                .enqueue(ChannelId::Regular(voice.channel), true, &mut self.scheduler, &self.memory)
                .with_context(|| format!("enqueue on channel {} failed", voice.channel))?;
            if let EnqueueResult::Suspended(_) = result {
                debug!("voice on channel {} blocked", voice.channel);
            }
            self.submitted_blocks += 1;
        }

        let Self {
            engine,
            scheduler,
            clock,
            host,
            ..
        } = self;
        let interval = engine.intervals().audio;
        clock.run_for(interval, |clock, id, late| {
            engine.handle_event(id, late, clock, scheduler, host);
        });
        Ok(())
    }

    /// Run until `frames` stereo frames have been mixed and pulled.
    pub fn render(&mut self, frames: usize) -> Result<Vec<i16>> {
        let puller = self.output();
        let mut out = Vec::with_capacity(frames * 2);
        let mut buffer = vec![0i16; self.engine.settings().block_samples()];

        while out.len() < frames * 2 {
            self.step()?;
            loop {
                let good = puller.pull(&mut buffer);
                out.extend_from_slice(&buffer[..good * 2]);
                if good * 2 < buffer.len() {
                    break;
                }
            }
        }
        out.truncate(frames * 2);
        Ok(out)
    }
}
