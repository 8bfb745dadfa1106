//! Save states
//!
//! The engine is captured into an [`AudioStateImage`], serialized in a fixed
//! little-endian field order and sealed with an xxHash3 checksum. Restoring
//! parses and validates the whole payload before touching the engine, so a
//! rejected state leaves everything as it was.

mod reader;
mod writer;


pub use reader::StateReader;
pub use writer::StateWriter;

use ringbuf::traits::{Consumer, Producer};
use tracing::{error, info};

use crate::channel::{CHANNEL_COUNT, Channel, SampleFormat, WaitingThread};
use crate::engine::AudioEngine;
use crate::queue;
use crate::timing::{
    AUDIO_HOST_UPDATE_EVENT, AUDIO_UPDATE_EVENT, AudioEvents, CoreTiming, EventId, TickIntervals,
};

/// Leading bytes of every audio save state
pub const STATE_MAGIC: [u8; 4] = *b"HLEA";

/// Current payload version
pub const STATE_VERSION: u8 = 1;

/// Errors from saving or restoring audio state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Recorded channel count differs from the live configuration
    #[error("state mismatch: expected {expected} channels, found {found}")]
    StateMismatch { expected: usize, found: usize },

    #[error("unsupported audio state version {0}")]
    UnsupportedVersion(u8),

    #[error("not an audio save state")]
    BadMagic,

    #[error("audio state checksum mismatch")]
    ChecksumMismatch,

    #[error("channel {channel} holds {len} samples, queue capacity is {capacity}")]
    QueueOverflow {
        channel: usize,
        len: usize,
        capacity: usize,
    },

    #[error("master queue holds {len} samples, capacity is {capacity}")]
    MasterOverflow { len: usize, capacity: usize },

    #[error("invalid sample format {0:#04x}")]
    InvalidFormat(u8),

    #[error("length prefix {0} out of range")]
    LengthOutOfRange(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialized audio state plus its checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStateSnapshot {
    pub data: Vec<u8>,
    /// xxHash3 of `data`
    pub checksum: u64,
}

impl AudioStateSnapshot {
    pub fn from_data(data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &[u8]) -> u64 {
        xxhash_rust::xxh3::xxh3_64(data)
    }

    /// Whether the payload still matches its checksum.
    pub fn verify(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File form: payload followed by the checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() + 8);
        bytes.extend_from_slice(&self.data);
        bytes.extend_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Split a file produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StateError> {
        let split = bytes.len().checked_sub(8).ok_or(StateError::BadMagic)?;
        let (data, tail) = bytes.split_at(split);
        let mut checksum = [0u8; 8];
        checksum.copy_from_slice(tail);
        Ok(Self {
            data: data.to_vec(),
            checksum: u64::from_le_bytes(checksum),
        })
    }

    /// Verify and parse the payload.
    pub fn image(&self) -> Result<AudioStateImage, StateError> {
        if !self.verify() {
            return Err(StateError::ChecksumMismatch);
        }
        StateReader::new(self.data.as_slice()).read_image()
    }
}

/// Decoded audio state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStateImage {
    pub update_event: EventId,
    pub host_event: EventId,
    pub mix_frequency: u32,
    /// Master queue contents in playback order
    pub master: Vec<i16>,
    pub channels: Vec<ChannelImage>,
}

/// Decoded state of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelImage {
    pub reserved: bool,
    pub sample_address: u32,
    pub sample_count: u32,
    pub format: SampleFormat,
    pub left_volume: u32,
    pub right_volume: u32,
    pub queue: Vec<i16>,
    pub waiting: Vec<WaitingThread>,
}

impl ChannelImage {
    fn capture(channel: &Channel) -> Self {
        Self {
            reserved: channel.reserved,
            sample_address: channel.sample_address,
            sample_count: channel.sample_count,
            format: channel.format,
            left_volume: channel.left_volume,
            right_volume: channel.right_volume,
            queue: channel.queued(),
            waiting: channel.waiting.to_vec(),
        }
    }

    fn apply(&self, channel: &mut Channel) {
        channel.reset();
        channel.reserved = self.reserved;
        channel.sample_address = self.sample_address;
        channel.sample_count = self.sample_count;
        channel.format = self.format;
        channel.set_volume(self.left_volume, self.right_volume);
        channel.queue.push_slice(&self.queue);
        channel.waiting.extend(self.waiting.iter().copied());
    }
}

impl AudioEngine {
    /// Capture the full engine state.
    pub fn save_state(&self) -> AudioStateSnapshot {
        let master = {
            let consumer = self
                .master_consumer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            queue::contents(&*consumer)
        };
        let image = AudioStateImage {
            update_event: self.events.update,
            host_event: self.events.host_update,
            mix_frequency: self.mix_frequency,
            master,
            channels: self.channels.iter().map(ChannelImage::capture).collect(),
        };

        let mut writer = StateWriter::new(Vec::new());
        // Writing into a Vec cannot fail.
        let _ = writer.write_image(&image);
        AudioStateSnapshot::from_data(writer.into_inner())
    }

    /// Restore a snapshot taken by [`save_state`](Self::save_state).
    ///
    /// On any error the engine is left untouched.
    pub fn load_state<T: CoreTiming + ?Sized>(
        &mut self,
        snapshot: &AudioStateSnapshot,
        timing: &mut T,
    ) -> Result<(), StateError> {
        let image = snapshot.image()?;
        self.validate_image(&image).inspect_err(|e| {
            error!("audio state rejected: {}", e);
        })?;

        timing.restore_register_event(image.update_event, AUDIO_UPDATE_EVENT);
        timing.restore_register_event(image.host_event, AUDIO_HOST_UPDATE_EVENT);
        self.events = AudioEvents {
            update: image.update_event,
            host_update: image.host_event,
        };
        self.mix_frequency = image.mix_frequency;

        {
            let mut consumer = self
                .master_consumer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            consumer.clear();
            self.master.push_slice(&image.master);
        }

        for (channel, saved) in self.channels.iter_mut().zip(&image.channels) {
            saved.apply(channel);
        }

        self.intervals = TickIntervals::compute(&self.settings, timing);
        info!(
            "audio state restored: {} master samples, {} reserved channels",
            image.master.len(),
            image.channels.iter().filter(|c| c.reserved).count()
        );
        Ok(())
    }

    fn validate_image(&self, image: &AudioStateImage) -> Result<(), StateError> {
        if image.channels.len() != CHANNEL_COUNT {
            return Err(StateError::StateMismatch {
                expected: CHANNEL_COUNT,
                found: image.channels.len(),
            });
        }

        let capacity = self.settings.master_queue_capacity.max(1);
        if image.master.len() > capacity {
            return Err(StateError::MasterOverflow {
                len: image.master.len(),
                capacity,
            });
        }

        for (index, (saved, live)) in image.channels.iter().zip(&self.channels).enumerate() {
            if saved.queue.len() > live.queue_capacity() {
                return Err(StateError::QueueOverflow {
                    channel: index,
                    len: saved.queue.len(),
                    capacity: live.queue_capacity(),
                });
            }
        }
        Ok(())
    }
}
