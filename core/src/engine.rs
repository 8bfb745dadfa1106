//! Audio engine
//!
//! Owns every channel, the mix accumulator and the producer side of the
//! master queue. All methods run on the emulation timeline; only the
//! [`OutputPuller`] handed out by [`AudioEngine::output`] crosses to the host
//! audio thread.

use std::sync::Arc;

use ringbuf::HeapProd;
use ringbuf::traits::Consumer;
use tracing::{info, warn};

use crate::channel::{CHANNEL_COUNT, Channel, SampleFormat, UNITY_VOLUME};
use crate::config::{AudioSettings, HW_SAMPLE_RATE};
use crate::error::AudioError;
use crate::kernel::ThreadScheduler;
use crate::mixer::MixerStats;
use crate::output::{self, OutputPuller, OutputStats, SharedConsumer};
use crate::submission::WakeReason;
use crate::timing::{
    AUDIO_HOST_UPDATE_EVENT, AUDIO_UPDATE_EVENT, AudioEvents, CoreTiming, TickIntervals,
};
use crate::volume::ScaleKernel;

/// Audio submission and mixing engine.
pub struct AudioEngine {
    pub(crate) settings: AudioSettings,
    pub(crate) channels: Vec<Channel>,
    /// Per-tick accumulator, `hw_block_size * 2` samples
    pub(crate) mix_buffer: Vec<i32>,
    pub(crate) master: HeapProd<i16>,
    pub(crate) master_consumer: SharedConsumer,
    output_stats: Arc<OutputStats>,
    pub(crate) events: AudioEvents,
    pub(crate) intervals: TickIntervals,
    pub(crate) mix_frequency: u32,
    pub(crate) kernel: ScaleKernel,
    pub(crate) stats: MixerStats,
}

impl AudioEngine {
    /// Initialize the engine and schedule both recurring clock events.
    ///
    /// Zero block sizes are raised to one frame.
    pub fn new<T: CoreTiming + ?Sized>(settings: AudioSettings, timing: &mut T) -> Self {
        if settings.hw_block_size == 0 || settings.host_attempt_block_size == 0 {
            warn!("audio block sizes must be non-zero, using one frame");
        }
        let settings = AudioSettings {
            hw_block_size: settings.hw_block_size.max(1),
            host_attempt_block_size: settings.host_attempt_block_size.max(1),
            ..settings
        };
        let channels = (0..CHANNEL_COUNT)
            .map(|_| Channel::new(settings.channel_queue_capacity))
            .collect();
        let (master, master_consumer) = output::master_queue(settings.master_queue_capacity);

        let events = AudioEvents {
            update: timing.register_event(AUDIO_UPDATE_EVENT),
            host_update: timing.register_event(AUDIO_HOST_UPDATE_EVENT),
        };
        let intervals = TickIntervals::compute(&settings, timing);
        timing.schedule_event(intervals.audio, events.update);
        timing.schedule_event(intervals.host, events.host_update);

        let kernel = ScaleKernel::detect();
        info!(
            "audio engine: {:?} latency, {} frames/tick, {} kernel",
            settings.latency,
            settings.hw_block_size,
            kernel.name()
        );

        Self {
            settings,
            channels,
            mix_buffer: vec![0; settings.block_samples()],
            master,
            master_consumer,
            output_stats: Arc::new(OutputStats::default()),
            events,
            intervals,
            mix_frequency: HW_SAMPLE_RATE,
            kernel,
            stats: MixerStats::default(),
        }
    }

    /// Force a specific scale kernel (the scalar path is always available).
    pub fn with_kernel(mut self, kernel: ScaleKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Handle for the host audio thread.
    pub fn output(&self) -> OutputPuller {
        OutputPuller::new(self.master_consumer.clone(), self.output_stats.clone())
    }

    /// Drop all queued audio. Channel reservations are kept.
    pub fn shutdown(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        self.clear_master();
    }

    pub(crate) fn clear_master(&mut self) {
        if let Ok(mut consumer) = self.master_consumer.lock() {
            consumer.clear();
        }
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn kernel(&self) -> ScaleKernel {
        self.kernel
    }

    pub fn mix_frequency(&self) -> u32 {
        self.mix_frequency
    }

    /// Record the guest's requested output rate.
    ///
    /// Mixing stays at the hardware rate; the value is informational.
    pub fn set_output_frequency(&mut self, frequency: u32) {
        if frequency != HW_SAMPLE_RATE {
            warn!(
                "output frequency {} Hz requested, mixing continues at {} Hz",
                frequency, HW_SAMPLE_RATE
            );
        }
        self.mix_frequency = frequency;
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// Claim a channel for a voice.
    ///
    /// The channel starts at unity volume with an empty queue.
    pub fn reserve_channel(
        &mut self,
        index: usize,
        sample_count: u32,
        format: SampleFormat,
    ) -> Result<(), AudioError> {
        let channel = self
            .channels
            .get_mut(index)
            .ok_or(AudioError::InvalidChannel(index as u32))?;
        if channel.reserved {
            return Err(AudioError::ChannelAlreadyReserved);
        }
        channel.reset();
        channel.reserved = true;
        channel.sample_count = sample_count;
        channel.format = format;
        channel.set_volume(UNITY_VOLUME, UNITY_VOLUME);
        Ok(())
    }

    /// Release a channel.
    ///
    /// Threads still waiting on it resume with CHANNEL_NOT_RESERVED before
    /// the channel is reset.
    pub fn release_channel<S: ThreadScheduler + ?Sized>(
        &mut self,
        index: usize,
        scheduler: &mut S,
    ) -> Result<(), AudioError> {
        let channel = self
            .channels
            .get(index)
            .ok_or(AudioError::InvalidChannel(index as u32))?;
        if !channel.reserved {
            return Err(AudioError::ChannelNotReserved);
        }
        self.wake_all_waiting_threads(index, WakeReason::Released, scheduler);
        self.channels[index].reset();
        Ok(())
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("settings", &self.settings)
            .field("events", &self.events)
            .field("intervals", &self.intervals)
            .field("mix_frequency", &self.mix_frequency)
            .field("kernel", &self.kernel)
            .finish_non_exhaustive()
    }
}
