//! Save-state writer

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::{AudioStateImage, ChannelImage, STATE_MAGIC, STATE_VERSION};

/// Writer for the audio save-state payload
pub struct StateWriter<W: Write> {
    writer: W,
}

impl<W: Write> StateWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a complete image in persisted field order.
    pub fn write_image(&mut self, image: &AudioStateImage) -> io::Result<()> {
        self.writer.write_all(&STATE_MAGIC)?;
        self.writer.write_u8(STATE_VERSION)?;
        self.writer.write_i32::<LittleEndian>(image.update_event.0)?;
        self.writer.write_i32::<LittleEndian>(image.host_event.0)?;
        self.writer.write_u32::<LittleEndian>(image.mix_frequency)?;
        self.write_samples(&image.master)?;

        self.writer.write_u32::<LittleEndian>(image.channels.len() as u32)?;
        for channel in &image.channels {
            self.write_channel(channel)?;
        }
        Ok(())
    }

    fn write_channel(&mut self, channel: &ChannelImage) -> io::Result<()> {
        self.writer.write_u8(channel.reserved as u8)?;
        self.writer.write_u32::<LittleEndian>(channel.sample_address)?;
        self.writer.write_u32::<LittleEndian>(channel.sample_count)?;
        self.writer.write_u8(channel.format as u8)?;
        self.writer.write_u32::<LittleEndian>(channel.left_volume)?;
        self.writer.write_u32::<LittleEndian>(channel.right_volume)?;
        self.write_samples(&channel.queue)?;

        self.writer.write_u32::<LittleEndian>(channel.waiting.len() as u32)?;
        for waiter in &channel.waiting {
            self.writer.write_u32::<LittleEndian>(waiter.thread.0)?;
            self.writer.write_i32::<LittleEndian>(waiter.remaining)?;
        }
        Ok(())
    }

    fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        self.writer.write_u32::<LittleEndian>(samples.len() as u32)?;
        for &sample in samples {
            self.writer.write_i16::<LittleEndian>(sample)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
