//! Sample submission with backpressure
//!
//! An enqueue onto a channel that still holds audio either fails (non-blocking)
//! or parks the calling virtual thread until the mixer has drained enough of
//! the queue. The new block is converted and queued in both cases.

use ringbuf::traits::{Observer, Producer};
use tracing::{debug, trace, warn};

use crate::channel::{CHANNEL_MAX, ChannelId, SampleFormat, UNITY_VOLUME, WaitingThread};
use crate::engine::AudioEngine;
use crate::error::{
    AudioError, ERROR_AUDIO_CHANNEL_NOT_RESERVED, ERROR_KERNEL_CANNOT_BE_CALLED_FROM_INTERRUPT,
};
use crate::kernel::{ThreadScheduler, WaitType};
use crate::memory::{self, GuestMemory};
use crate::queue;
use crate::volume::{adjust_volume, gain_for};

/// Outcome of a successful enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Samples queued; the value is the guest return value
    Accepted(u32),
    /// Samples queued and the calling thread parked; it resumes with the value
    Suspended(u32),
    /// Blocking was requested while the scheduler could not dispatch. The
    /// samples were still queued.
    CannotWait,
}

impl EnqueueResult {
    /// 32-bit value the guest sees in its return register.
    pub fn guest_code(self) -> u32 {
        match self {
            Self::Accepted(value) | Self::Suspended(value) => value,
            Self::CannotWait => ERROR_KERNEL_CANNOT_BE_CALLED_FROM_INTERRUPT,
        }
    }
}

/// Why waiting threads are being woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The mixer drained the channel; threads get their remembered value
    Drained,
    /// The channel was released; threads get CHANNEL_NOT_RESERVED
    Released,
}

impl AudioEngine {
    /// Queue the channel's current source block.
    pub fn enqueue<S, M>(
        &mut self,
        id: ChannelId,
        blocking: bool,
        scheduler: &mut S,
        memory: &M,
    ) -> Result<EnqueueResult, AudioError>
    where
        S: ThreadScheduler + ?Sized,
        M: GuestMemory + ?Sized,
    {
        let index = match id {
            ChannelId::Regular(n) if n >= CHANNEL_MAX => {
                return Err(AudioError::InvalidChannel(n as u32));
            }
            _ => id.index(),
        };
        let min_factor = self.settings.queue_min_size_factor.max(1);
        let channel = &mut self.channels[index];

        let ret = if channel.sample_address == 0 && id.reports_zero_without_source() {
            0
        } else {
            channel.sample_count
        };
        let mut result = EnqueueResult::Accepted(ret);

        if !channel.is_idle() {
            if !blocking {
                return Err(AudioError::ChannelBusy);
            }

            let threshold = channel.queued_samples() / 2 / min_factor;
            if scheduler.is_dispatch_enabled() {
                let thread = scheduler.current_thread();
                channel.waiting.push(WaitingThread {
                    thread,
                    remaining: i32::try_from(threshold).unwrap_or(i32::MAX),
                });
                scheduler.wait_current_thread(
                    WaitType::AudioChannel,
                    index as u32 + 1,
                    ret,
                    "blocking audio",
                );
                trace!("thread {:?} waiting on channel {} ({} frames)", thread, index, threshold);
                result = EnqueueResult::Suspended(ret);
            } else {
                debug!("channel {}: blocking enqueue while dispatch is disabled", index);
                result = EnqueueResult::CannotWait;
            }
        }

        if channel.sample_address == 0 {
            return Ok(result);
        }

        self.push_source(index, memory);
        Ok(result)
    }

    /// Convert the source block of channel `index` into its queue.
    fn push_source<M: GuestMemory + ?Sized>(&mut self, index: usize, memory: &M) {
        let kernel = self.kernel;
        let channel = &mut self.channels[index];
        let address = channel.sample_address;
        let frames = channel.sample_count as usize;
        let byte_len = frames * channel.format.samples_per_frame() * 2;

        if !memory::is_valid_range(memory, address, byte_len) {
            debug!(
                "channel {}: invalid source {:#010x} (+{} bytes), nothing queued",
                index, address, byte_len
            );
            return;
        }

        let room_frames = channel.queue.vacant_len() / 2;
        let accepted = frames.min(room_frames);
        if accepted < frames {
            warn!(
                "channel {}: queue overflow, dropping {} of {} frames",
                index,
                frames - accepted,
                frames
            );
        }

        match channel.format {
            SampleFormat::Stereo => {
                let Some(src) = memory.slice(address, byte_len) else {
                    debug!("channel {}: source {:#010x} not readable", index, address);
                    return;
                };
                let unity = channel.left_volume == UNITY_VOLUME
                    && channel.right_volume == UNITY_VOLUME
                    && cfg!(target_endian = "little");

                if unity {
                    queue::push_with(&mut channel.queue, accepted * 2, |segment, offset| {
                        let bytes = &src[offset * 2..(offset + segment.len()) * 2];
                        bytemuck::cast_slice_mut::<i16, u8>(segment).copy_from_slice(bytes);
                    });
                } else {
                    let gains = [gain_for(channel.left_volume), gain_for(channel.right_volume)];
                    queue::push_with(&mut channel.queue, accepted * 2, |segment, offset| {
                        let bytes = &src[offset * 2..(offset + segment.len()) * 2];
                        kernel.scale_stereo(bytes, segment, gains, offset);
                    });
                }
            }
            SampleFormat::Mono => {
                let left = gain_for(channel.left_volume);
                let right = gain_for(channel.right_volume);
                for i in 0..accepted {
                    let sample = memory.read_u16(address + (i as u32) * 2) as i16;
                    let pushed = channel.queue.try_push(adjust_volume(sample, left)).is_ok()
                        && channel.queue.try_push(adjust_volume(sample, right)).is_ok();
                    debug_assert!(pushed, "mono frame {} exceeded the room reserved for it", i);
                }
            }
        }
    }

    /// Advance every waiter on channel `index` by `step` frames and resume
    /// those whose countdown reached zero.
    ///
    /// Waiters whose thread is no longer in this channel's wait are dropped
    /// without being resumed.
    pub fn wake_waiting_threads<S: ThreadScheduler + ?Sized>(
        &mut self,
        index: usize,
        reason: WakeReason,
        step: i32,
        scheduler: &mut S,
    ) {
        let Some(channel) = self.channels.get_mut(index) else {
            return;
        };
        let key = index as u32 + 1;
        let mut woke = false;

        channel.waiting.retain(|waiter| {
            waiter.remaining = waiter.remaining.saturating_sub(step);
            if scheduler.wait_id(waiter.thread, WaitType::AudioChannel) != Some(key) {
                trace!("thread {:?} left channel {} wait", waiter.thread, index);
                return false;
            }
            if waiter.remaining > 0 {
                return true;
            }

            let value = match reason {
                WakeReason::Drained => scheduler.wait_value(waiter.thread).unwrap_or(0),
                WakeReason::Released => ERROR_AUDIO_CHANNEL_NOT_RESERVED,
            };
            scheduler.resume_thread_from_wait(waiter.thread, value);
            trace!("thread {:?} resumed from channel {} with {:#x}", waiter.thread, index, value);
            woke = true;
            false
        });

        if woke {
            scheduler.reschedule("audio drain");
        }
    }

    /// Resume every waiter on channel `index` regardless of its countdown.
    pub fn wake_all_waiting_threads<S: ThreadScheduler + ?Sized>(
        &mut self,
        index: usize,
        reason: WakeReason,
        scheduler: &mut S,
    ) {
        self.wake_waiting_threads(index, reason, i32::MAX, scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_codes() {
        assert_eq!(EnqueueResult::Accepted(256).guest_code(), 256);
        assert_eq!(EnqueueResult::Suspended(64).guest_code(), 64);
        assert_eq!(EnqueueResult::CannotWait.guest_code(), 0x800201A7);
    }
}
