//! Guest-visible audio errors and result codes

/// Busy: the channel still holds queued samples
pub const ERROR_AUDIO_CHANNEL_BUSY: u32 = 0x8026_0002;

/// The channel index is out of range or already reserved
pub const ERROR_AUDIO_INVALID_CHANNEL: u32 = 0x8026_0003;

/// The channel was released while a thread was waiting on it
pub const ERROR_AUDIO_CHANNEL_NOT_RESERVED: u32 = 0x8026_0008;

/// Blocking was requested but the scheduler cannot dispatch right now
pub const ERROR_KERNEL_CANNOT_BE_CALLED_FROM_INTERRUPT: u32 = 0x8002_01A7;

/// Errors reported to the guest by channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("audio channel is busy")]
    ChannelBusy,

    #[error("audio channel is not reserved")]
    ChannelNotReserved,

    #[error("audio channel is already reserved")]
    ChannelAlreadyReserved,

    #[error("invalid audio channel {0}")]
    InvalidChannel(u32),
}

impl AudioError {
    /// 32-bit error code returned to the guest.
    pub fn code(self) -> u32 {
        match self {
            Self::ChannelBusy => ERROR_AUDIO_CHANNEL_BUSY,
            Self::ChannelNotReserved => ERROR_AUDIO_CHANNEL_NOT_RESERVED,
            Self::ChannelAlreadyReserved | Self::InvalidChannel(_) => ERROR_AUDIO_INVALID_CHANNEL,
        }
    }
}
