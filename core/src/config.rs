//! Audio configuration (audio.toml)
//!
//! The latency profile is chosen once when the engine is created. Everything
//! derived from it lives in [`AudioSettings`], an immutable value handed to
//! [`AudioEngine::new`](crate::AudioEngine::new) and threaded through every
//! component from there.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Native output rate of the emulated audio hardware.
pub const HW_SAMPLE_RATE: u32 = 44_100;

/// Default per-channel queue capacity in samples (interleaved stereo).
pub const DEFAULT_CHANNEL_QUEUE_CAPACITY: usize = 32_768;

/// Default master queue capacity in samples (interleaved stereo).
pub const DEFAULT_MASTER_QUEUE_CAPACITY: usize = 8_192;

/// Latency profile selecting block sizes and blocking watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LatencyProfile {
    Low,
    #[default]
    Medium,
    High,
}

impl LatencyProfile {
    /// Parse a profile name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Error loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A queue cannot hold a single mix block
    #[error("{name} capacity {capacity} is smaller than one mix block ({required} samples)")]
    InvalidCapacity {
        name: &'static str,
        capacity: usize,
        required: usize,
    },
}

/// User-facing audio configuration.
///
/// Serialized to/from TOML. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Latency profile (default: medium)
    #[serde(default)]
    pub latency: LatencyProfile,
    /// Capacity of each channel's sample queue, in samples (default: 32768)
    #[serde(default = "default_channel_queue_capacity")]
    pub channel_queue_capacity: usize,
    /// Capacity of the master output queue, in samples (default: 8192)
    #[serde(default = "default_master_queue_capacity")]
    pub master_queue_capacity: usize,
}

fn default_channel_queue_capacity() -> usize {
    DEFAULT_CHANNEL_QUEUE_CAPACITY
}
fn default_master_queue_capacity() -> usize {
    DEFAULT_MASTER_QUEUE_CAPACITY
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            latency: LatencyProfile::default(),
            channel_queue_capacity: default_channel_queue_capacity(),
            master_queue_capacity: default_master_queue_capacity(),
        }
    }
}

impl AudioConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Write the config file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Render the config as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate and derive the immutable engine settings.
    pub fn settings(&self) -> Result<AudioSettings, ConfigError> {
        let settings = AudioSettings {
            channel_queue_capacity: self.channel_queue_capacity,
            master_queue_capacity: self.master_queue_capacity,
            ..AudioSettings::from_profile(self.latency)
        };

        let required = settings.block_samples();
        for (name, capacity) in [
            ("channel_queue_capacity", settings.channel_queue_capacity),
            ("master_queue_capacity", settings.master_queue_capacity),
        ] {
            if capacity < required {
                return Err(ConfigError::InvalidCapacity {
                    name,
                    capacity,
                    required,
                });
            }
        }
        Ok(settings)
    }
}

/// Immutable engine settings derived from [`AudioConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    pub latency: LatencyProfile,
    /// Frames mixed per internal tick
    pub hw_block_size: usize,
    /// Frames the host output nominally pulls at a time
    pub host_attempt_block_size: usize,
    /// High watermark factor (not consulted when computing wake thresholds)
    pub queue_max_size_factor: usize,
    /// Divisor applied to queue occupancy to get the blocking threshold
    pub queue_min_size_factor: usize,
    pub channel_queue_capacity: usize,
    pub master_queue_capacity: usize,
}

impl AudioSettings {
    /// Settings for a latency profile with default queue capacities.
    pub fn from_profile(latency: LatencyProfile) -> Self {
        let (hw_block_size, host_attempt_block_size, max_factor, min_factor) = match latency {
            LatencyProfile::Low => (16, 256, 1, 1),
            LatencyProfile::Medium => (64, 512, 2, 1),
            LatencyProfile::High => (64, 512, 4, 2),
        };
        Self {
            latency,
            hw_block_size,
            host_attempt_block_size,
            queue_max_size_factor: max_factor,
            queue_min_size_factor: min_factor,
            channel_queue_capacity: DEFAULT_CHANNEL_QUEUE_CAPACITY,
            master_queue_capacity: DEFAULT_MASTER_QUEUE_CAPACITY,
        }
    }

    /// Interleaved stereo samples in one mix block.
    pub fn block_samples(&self) -> usize {
        self.hw_block_size * 2
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::from_profile(LatencyProfile::default())
    }
}
