//! Save-state reader

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{AudioStateImage, ChannelImage, STATE_MAGIC, STATE_VERSION, StateError};
use crate::channel::{SampleFormat, WaitingThread};
use crate::kernel::ThreadId;
use crate::timing::EventId;

/// Upper bound on any length prefix, so corrupt data cannot request huge
/// allocations.
const MAX_ENTRIES: usize = 1 << 24;

/// Reader for the audio save-state payload
pub struct StateReader<R: Read> {
    reader: R,
}

impl<R: Read> StateReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read a complete image.
    pub fn read_image(&mut self) -> Result<AudioStateImage, StateError> {
        let mut magic = [0u8; 4];
        self.reader.read_exact(&mut magic)?;
        if magic != STATE_MAGIC {
            return Err(StateError::BadMagic);
        }
        let version = self.reader.read_u8()?;
        if version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(version));
        }

        let update_event = EventId(self.reader.read_i32::<LittleEndian>()?);
        let host_event = EventId(self.reader.read_i32::<LittleEndian>()?);
        let mix_frequency = self.reader.read_u32::<LittleEndian>()?;
        let master = self.read_samples()?;

        let channel_count = self.read_len()?;
        let mut channels = Vec::with_capacity(channel_count.min(64));
        for _ in 0..channel_count {
            channels.push(self.read_channel()?);
        }

        Ok(AudioStateImage {
            update_event,
            host_event,
            mix_frequency,
            master,
            channels,
        })
    }

    fn read_channel(&mut self) -> Result<ChannelImage, StateError> {
        let reserved = self.reader.read_u8()? != 0;
        let sample_address = self.reader.read_u32::<LittleEndian>()?;
        let sample_count = self.reader.read_u32::<LittleEndian>()?;
        let raw_format = self.reader.read_u8()?;
        let format =
            SampleFormat::from_u8(raw_format).ok_or(StateError::InvalidFormat(raw_format))?;
        let left_volume = self.reader.read_u32::<LittleEndian>()?;
        let right_volume = self.reader.read_u32::<LittleEndian>()?;
        let queue = self.read_samples()?;

        let waiter_count = self.read_len()?;
        let mut waiting = Vec::with_capacity(waiter_count.min(64));
        for _ in 0..waiter_count {
            let thread = ThreadId(self.reader.read_u32::<LittleEndian>()?);
            let remaining = self.reader.read_i32::<LittleEndian>()?;
            waiting.push(WaitingThread { thread, remaining });
        }

        Ok(ChannelImage {
            reserved,
            sample_address,
            sample_count,
            format,
            left_volume,
            right_volume,
            queue,
            waiting,
        })
    }

    fn read_samples(&mut self) -> Result<Vec<i16>, StateError> {
        let len = self.read_len()?;
        let mut samples = vec![0i16; len];
        self.reader.read_i16_into::<LittleEndian>(&mut samples)?;
        Ok(samples)
    }

    fn read_len(&mut self) -> Result<usize, StateError> {
        let len = self.reader.read_u32::<LittleEndian>()? as usize;
        if len > MAX_ENTRIES {
            return Err(StateError::LengthOutOfRange(len));
        }
        Ok(len)
    }
}
