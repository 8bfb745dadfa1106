//! Integration tests for the audio core
//!
//! Drives the engine through the headless collaborators: submission and
//! blocking, mix ticks, clock-driven scheduling, host pulls and save states.

#[cfg(test)]
mod mixing_tests;
#[cfg(test)]
mod timing_tests;

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::config::{AudioSettings, LatencyProfile};
    use crate::engine::AudioEngine;
    use crate::headless::{CountingHost, FlatMemory, HeadlessClock, HeadlessScheduler};
    use crate::{ChannelId, EnqueueResult, SampleFormat};

    /// Start of the emulated RAM window
    pub const RAM_BASE: u32 = 0x0880_0000;
    /// Size of the emulated RAM window
    pub const RAM_SIZE: usize = 0x10_0000;

    /// Engine plus one of each headless collaborator.
    pub struct Rig {
        pub engine: AudioEngine,
        pub scheduler: HeadlessScheduler,
        pub clock: HeadlessClock,
        pub memory: FlatMemory,
        pub host: CountingHost,
    }

    impl Rig {
        pub fn new(latency: LatencyProfile) -> Self {
            Self::with_settings(AudioSettings::from_profile(latency))
        }

        pub fn with_settings(settings: AudioSettings) -> Self {
            let mut clock = HeadlessClock::default();
            let engine = AudioEngine::new(settings, &mut clock);
            Self {
                engine,
                scheduler: HeadlessScheduler::new(),
                clock,
                memory: FlatMemory::new(RAM_BASE, RAM_SIZE),
                host: CountingHost::default(),
            }
        }

        /// Reserve `index`, store `samples` at `address` and point the
        /// channel at them.
        pub fn setup_channel(
            &mut self,
            index: usize,
            format: SampleFormat,
            address: u32,
            samples: &[i16],
        ) {
            let frames = samples.len() / format.samples_per_frame();
            self.engine
                .reserve_channel(index, frames as u32, format)
                .unwrap();
            assert!(self.memory.write_samples(address, samples));
            self.engine.channel_mut(index).unwrap().sample_address = address;
        }

        pub fn enqueue(&mut self, index: usize, blocking: bool) -> EnqueueResult {
            self.enqueue_id(ChannelId::Regular(index), blocking)
        }

        pub fn enqueue_id(&mut self, id: ChannelId, blocking: bool) -> EnqueueResult {
            self.engine
                .enqueue(id, blocking, &mut self.scheduler, &self.memory)
                .unwrap()
        }

        pub fn tick(&mut self, count: usize) {
            for _ in 0..count {
                self.engine.update(&mut self.scheduler);
            }
        }

        /// Advance the virtual clock, dispatching audio events on time.
        pub fn run_cycles(&mut self, cycles: i64) {
            let Rig {
                engine,
                scheduler,
                clock,
                host,
                ..
            } = self;
            clock.run_for(cycles, |clock, id, late| {
                assert!(engine.handle_event(id, late, clock, scheduler, host));
            });
        }

        /// Pull everything currently mixed.
        pub fn drain_output(&self) -> Vec<i16> {
            let puller = self.engine.output();
            let mut out = Vec::new();
            let mut buffer = [0i16; 256];
            loop {
                let frames = puller.pull(&mut buffer);
                out.extend_from_slice(&buffer[..frames * 2]);
                if frames < buffer.len() / 2 {
                    return out;
                }
            }
        }
    }

    /// `frames` stereo frames of a constant value.
    pub fn constant_stereo(frames: usize, value: i16) -> Vec<i16> {
        vec![value; frames * 2]
    }

    /// A deterministic ramp touching both extremes.
    pub fn ramp(len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| (i as i32 * 7919 % 65536 - 32768) as i16)
            .collect()
    }
}
