//! Channel store
//!
//! Per-channel descriptor, volume, private sample queue and the list of
//! virtual threads blocked on that queue draining.

use ringbuf::traits::{Consumer, Observer};
use smallvec::SmallVec;

use crate::kernel::ThreadId;
use crate::queue::{self, SampleQueue};

/// Number of regular output channels
pub const CHANNEL_MAX: usize = 8;

/// Slot shared by the SRC and OUTPUT2 voices
pub const SHARED_OUTPUT_CHANNEL: usize = CHANNEL_MAX;

/// Total channel slots (regular channels plus the shared output slot)
pub const CHANNEL_COUNT: usize = CHANNEL_MAX + 1;

/// Volume that leaves samples untouched
pub const UNITY_VOLUME: u32 = 0x8000;

/// Largest guest volume (just under 2x gain)
pub const MAX_VOLUME: u32 = 0xFFFF;

/// Which voice an enqueue comes from.
///
/// `Src` and `Output2` both play through [`SHARED_OUTPUT_CHANNEL`], but they
/// keep their identity because an enqueue without a source address reports
/// zero samples for them and the sample count for regular channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    Regular(usize),
    Src,
    Output2,
}

impl ChannelId {
    /// Channel slot backing this voice.
    pub fn index(self) -> usize {
        match self {
            Self::Regular(index) => index,
            Self::Src | Self::Output2 => SHARED_OUTPUT_CHANNEL,
        }
    }

    /// Whether an empty source address makes the enqueue report 0 samples.
    pub fn reports_zero_without_source(self) -> bool {
        matches!(self, Self::Src | Self::Output2)
    }
}

/// Source sample layout
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// Interleaved left/right pairs
    #[default]
    Stereo = 0x00,
    /// One sample per frame, expanded to both sides
    Mono = 0x10,
}

impl SampleFormat {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Stereo),
            0x10 => Some(Self::Mono),
            _ => None,
        }
    }

    /// Guest samples per frame.
    pub fn samples_per_frame(self) -> usize {
        match self {
            Self::Stereo => 2,
            Self::Mono => 1,
        }
    }
}

/// A virtual thread parked until this channel drains below its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitingThread {
    pub thread: ThreadId,
    /// Frames still to be drained before the thread may resume
    pub remaining: i32,
}

/// One audio channel.
pub struct Channel {
    pub reserved: bool,
    /// Guest address of the next block to enqueue (0 = none)
    pub sample_address: u32,
    /// Frames per enqueue
    pub sample_count: u32,
    pub format: SampleFormat,
    pub left_volume: u32,
    pub right_volume: u32,
    pub(crate) queue: SampleQueue,
    pub(crate) waiting: SmallVec<[WaitingThread; 4]>,
}

impl Channel {
    /// Create an unreserved channel whose queue holds `queue_capacity` samples.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            reserved: false,
            sample_address: 0,
            sample_count: 0,
            format: SampleFormat::Stereo,
            left_volume: 0,
            right_volume: 0,
            queue: queue::sample_queue(queue_capacity),
            waiting: SmallVec::new(),
        }
    }

    /// Empty the sample queue and forget waiting threads.
    ///
    /// Reservation and descriptor fields are untouched. Waiting threads are
    /// not resumed; callers that need that must wake them first.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.waiting.clear();
    }

    /// Clear the channel and return it to the unreserved state.
    pub fn reset(&mut self) {
        self.clear();
        self.reserved = false;
        self.sample_address = 0;
        self.sample_count = 0;
        self.format = SampleFormat::Stereo;
        self.left_volume = 0;
        self.right_volume = 0;
    }

    /// Set both volumes, saturating at [`MAX_VOLUME`].
    pub fn set_volume(&mut self, left: u32, right: u32) {
        self.left_volume = left.min(MAX_VOLUME);
        self.right_volume = right.min(MAX_VOLUME);
    }

    /// Samples currently queued (two per stereo frame).
    pub fn queued_samples(&self) -> usize {
        self.queue.occupied_len()
    }

    /// Capacity of the sample queue in samples.
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity().get()
    }

    /// Copy of the queued samples in playback order.
    pub fn queued(&self) -> Vec<i16> {
        queue::contents(&self.queue)
    }

    pub fn waiting_threads(&self) -> &[WaitingThread] {
        &self.waiting
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("reserved", &self.reserved)
            .field("sample_address", &format_args!("{:#010x}", self.sample_address))
            .field("sample_count", &self.sample_count)
            .field("format", &self.format)
            .field("left_volume", &self.left_volume)
            .field("right_volume", &self.right_volume)
            .field("queued", &self.queued_samples())
            .field("waiting", &self.waiting.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Producer;

    #[test]
    fn test_channel_id_index() {
        assert_eq!(ChannelId::Regular(3).index(), 3);
        assert_eq!(ChannelId::Src.index(), SHARED_OUTPUT_CHANNEL);
        assert_eq!(ChannelId::Output2.index(), SHARED_OUTPUT_CHANNEL);
        assert!(!ChannelId::Regular(8).reports_zero_without_source());
        assert!(ChannelId::Src.reports_zero_without_source());
    }

    #[test]
    fn test_clear_keeps_descriptor() {
        let mut channel = Channel::new(64);
        channel.reserved = true;
        channel.sample_address = 0x0880_0000;
        channel.sample_count = 16;
        channel.set_volume(UNITY_VOLUME, 0x4000);
        channel.queue.push_slice(&[1, 2, 3, 4]);
        channel.waiting.push(WaitingThread {
            thread: ThreadId(7),
            remaining: 2,
        });

        channel.clear();

        assert_eq!(channel.queued_samples(), 0);
        assert!(channel.waiting_threads().is_empty());
        assert!(channel.reserved);
        assert_eq!(channel.sample_address, 0x0880_0000);
        assert_eq!(channel.sample_count, 16);
        assert_eq!((channel.left_volume, channel.right_volume), (UNITY_VOLUME, 0x4000));
    }

    #[test]
    fn test_reset_unreserves() {
        let mut channel = Channel::new(64);
        channel.reserved = true;
        channel.format = SampleFormat::Mono;
        channel.queue.push_slice(&[5, 5]);
        channel.reset();
        assert!(!channel.reserved);
        assert_eq!(channel.format, SampleFormat::Stereo);
        assert!(channel.is_idle());
    }

    #[test]
    fn test_set_volume_saturates() {
        let mut channel = Channel::new(8);
        channel.set_volume(0x2_0000, 0x1234);
        assert_eq!(channel.left_volume, MAX_VOLUME);
        assert_eq!(channel.right_volume, 0x1234);
    }

    #[test]
    fn test_sample_format_from_u8() {
        assert_eq!(SampleFormat::from_u8(0x00), Some(SampleFormat::Stereo));
        assert_eq!(SampleFormat::from_u8(0x10), Some(SampleFormat::Mono));
        assert_eq!(SampleFormat::from_u8(0x01), None);
    }
}
