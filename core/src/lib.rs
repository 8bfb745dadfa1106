//! HLE Audio Core - emulated audio submission and mixing
//!
//! Guest voices submit sample blocks to per-channel queues, a virtual-clock
//! driven tick mixes every reserved channel into the master queue, and the
//! host audio thread pulls mixed frames from it.
//!
//! # Architecture
//!
//! - [`AudioEngine`] - Channels, mix tick, submission and save states
//! - [`OutputPuller`] - Host-thread handle draining the master queue
//! - [`ThreadScheduler`], [`GuestMemory`], [`CoreTiming`], [`HostAudio`] -
//!   Collaborators supplied by the emulator
//! - [`headless`] - Standalone collaborators for tests and tools

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod headless;
#[cfg(test)]
mod integration;
pub mod kernel;
pub mod memory;
pub mod mixer;
pub mod output;
pub mod queue;
pub mod state;
pub mod submission;
pub mod timing;
pub mod volume;

pub use channel::{
    CHANNEL_COUNT, CHANNEL_MAX, Channel, ChannelId, SampleFormat, UNITY_VOLUME, WaitingThread,
};
pub use config::{AudioConfig, AudioSettings, ConfigError, HW_SAMPLE_RATE, LatencyProfile};
pub use engine::AudioEngine;
pub use error::AudioError;
pub use kernel::{ThreadId, ThreadScheduler, WaitType};
pub use memory::GuestMemory;
pub use mixer::MixerStats;
pub use output::{HostAudio, OutputPuller, OutputStatsSnapshot};
pub use state::{AudioStateImage, AudioStateSnapshot, ChannelImage, StateError};
pub use submission::{EnqueueResult, WakeReason};
pub use timing::{AudioEvents, CoreTiming, EventId, TickIntervals};
pub use volume::ScaleKernel;
