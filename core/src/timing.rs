//! Virtual-clock scheduling of the mix tick and the host poke
//!
//! Both events re-arm themselves for `interval - cycles_late`, so lateness
//! does not accumulate into drift.

use tracing::debug;

use crate::config::{AudioSettings, HW_SAMPLE_RATE};
use crate::engine::AudioEngine;
use crate::kernel::ThreadScheduler;
use crate::output::HostAudio;

/// Name of the mix tick event
pub const AUDIO_UPDATE_EVENT: &str = "AudioUpdate";

/// Name of the host poke event
pub const AUDIO_HOST_UPDATE_EVENT: &str = "AudioUpdateHost";

/// Handle of a registered virtual-clock event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub i32);

/// Deterministic virtual-cycle event scheduler.
///
/// Callbacks are identified by name; whoever drives the clock routes fired
/// events back to [`AudioEngine::handle_event`].
pub trait CoreTiming {
    /// Register a named event and return its id.
    fn register_event(&mut self, name: &'static str) -> EventId;

    /// Bind `name` to an id read back from a save state.
    fn restore_register_event(&mut self, id: EventId, name: &'static str);

    /// Fire `id` after `cycles` virtual cycles.
    fn schedule_event(&mut self, cycles: i64, id: EventId);

    /// Convert microseconds to cycles at the current clock rate.
    fn us_to_cycles(&self, us: i64) -> i64;
}

/// Ids of the two recurring audio events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioEvents {
    pub update: EventId,
    pub host_update: EventId,
}

/// Cycle intervals between mix ticks and host pokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickIntervals {
    pub audio: i64,
    pub host: i64,
}

impl TickIntervals {
    /// Derive both intervals from the clock's current rate.
    pub fn compute<T: CoreTiming + ?Sized>(settings: &AudioSettings, timing: &T) -> Self {
        let cycles_per_second = timing.us_to_cycles(1_000_000);
        let rate = HW_SAMPLE_RATE as i64;
        Self {
            audio: cycles_per_second * settings.hw_block_size as i64 / rate,
            host: cycles_per_second * settings.host_attempt_block_size as i64 / rate,
        }
    }
}

impl AudioEngine {
    /// Dispatch a fired clock event.
    ///
    /// Returns `false` if `id` is not one of the audio events.
    pub fn handle_event<T, S, H>(
        &mut self,
        id: EventId,
        cycles_late: i64,
        timing: &mut T,
        scheduler: &mut S,
        host: &mut H,
    ) -> bool
    where
        T: CoreTiming + ?Sized,
        S: ThreadScheduler + ?Sized,
        H: HostAudio + ?Sized,
    {
        if id == self.events.update {
            timing.schedule_event(self.intervals.audio - cycles_late, id);
            self.update(scheduler);
            true
        } else if id == self.events.host_update {
            timing.schedule_event(self.intervals.host - cycles_late, id);
            host.update_sound();
            true
        } else {
            false
        }
    }

    /// Recompute the tick intervals after the clock rate changed.
    pub fn on_clock_rate_change<T: CoreTiming + ?Sized>(&mut self, timing: &T) {
        self.intervals = TickIntervals::compute(&self.settings, timing);
        debug!(
            "audio intervals: {} cycles/tick, {} cycles/host poke",
            self.intervals.audio, self.intervals.host
        );
    }

    pub fn events(&self) -> AudioEvents {
        self.events
    }

    pub fn intervals(&self) -> TickIntervals {
        self.intervals
    }
}
