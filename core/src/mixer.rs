//! Master mix tick
//!
//! Every reserved channel is drained by one hardware block per tick and its
//! waiters advance by the same amount. Channel audio is summed (not averaged)
//! in 32 bits, then hard-clipped into the master queue.

use ringbuf::traits::Observer;
use tracing::{debug, trace};

use crate::config::HW_SAMPLE_RATE;
use crate::engine::AudioEngine;
use crate::kernel::ThreadScheduler;
use crate::queue;
use crate::submission::WakeReason;
use crate::volume::accumulate;

/// Mixer counters, logged about once per emulated second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerStats {
    /// Ticks run since the engine was created
    pub ticks: u64,
    /// Blocks pushed to the master queue
    pub blocks_pushed: u64,
    /// Blocks discarded because the master queue was full
    pub blocks_discarded: u64,
    /// Channel samples drained into the accumulator
    pub samples_mixed: u64,
}

impl AudioEngine {
    /// Run one mix tick.
    pub fn update<S: ThreadScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        let block_samples = self.settings.block_samples();
        let step = i32::try_from(self.settings.hw_block_size).unwrap_or(i32::MAX);
        self.mix_buffer.fill(0);

        for index in 0..self.channels.len() {
            if !self.channels[index].reserved {
                continue;
            }
            self.wake_waiting_threads(index, WakeReason::Drained, step, scheduler);

            let channel = &mut self.channels[index];
            if channel.is_idle() {
                continue;
            }
            let mix_buffer = &mut self.mix_buffer;
            let drained = queue::pop_with(&mut channel.queue, block_samples, |segment, offset| {
                accumulate(&mut mix_buffer[offset..offset + segment.len()], segment);
            });
            self.stats.samples_mixed += drained as u64;
        }

        if self.master.vacant_len() >= block_samples {
            let kernel = self.kernel;
            let mix_buffer = &self.mix_buffer;
            queue::push_with(&mut self.master, block_samples, |segment, offset| {
                kernel.clamp(&mix_buffer[offset..offset + segment.len()], segment);
            });
            self.stats.blocks_pushed += 1;
        } else {
            trace!("master queue full, discarding mixed block");
            self.stats.blocks_discarded += 1;
        }

        self.stats.ticks += 1;
        let ticks_per_second = (HW_SAMPLE_RATE as u64)
            .checked_div(self.settings.hw_block_size as u64)
            .unwrap_or(1)
            .max(1);
        if self.stats.ticks % ticks_per_second == 0 {
            let output = self.output().stats();
            debug!(
                "mixer: ticks={}, pushed={}, discarded={}, mixed={}, pulled={}, underruns={}",
                self.stats.ticks,
                self.stats.blocks_pushed,
                self.stats.blocks_discarded,
                self.stats.samples_mixed,
                output.frames_delivered,
                output.underruns
            );
        }
    }

    pub fn mixer_stats(&self) -> MixerStats {
        self.stats
    }
}
