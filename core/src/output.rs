//! Master output queue and the host-facing pull interface
//!
//! The master queue is the only structure shared with the host audio thread.
//! The engine owns the producer; the consumer sits behind a mutex that the
//! host side only ever `try_lock`s, so a pull never waits on the emulation
//! thread. Save/restore takes the same lock to read or replace the contents.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ringbuf::traits::Split;
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::debug;

use crate::queue;

/// Host audio backend hooks driven by the emulation timeline.
pub trait HostAudio {
    /// Periodic poke so the backend can do its own bookkeeping.
    fn update_sound(&mut self);
}

/// Shared consumer half of the master queue.
pub(crate) type SharedConsumer = Arc<Mutex<HeapCons<i16>>>;

/// Create the master queue, returning the producer and shared consumer.
pub(crate) fn master_queue(capacity: usize) -> (HeapProd<i16>, SharedConsumer) {
    let (producer, consumer) = HeapRb::<i16>::new(capacity.max(1)).split();
    (producer, Arc::new(Mutex::new(consumer)))
}

/// Counters updated by the host thread.
#[derive(Debug, Default)]
pub struct OutputStats {
    pulls: AtomicU64,
    frames_requested: AtomicU64,
    frames_delivered: AtomicU64,
    underruns: AtomicU64,
}

/// Point-in-time copy of [`OutputStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStatsSnapshot {
    pub pulls: u64,
    pub frames_requested: u64,
    pub frames_delivered: u64,
    pub underruns: u64,
}

impl OutputStats {
    fn record(&self, requested: usize, delivered: usize) {
        self.pulls.fetch_add(1, Ordering::Relaxed);
        self.frames_requested.fetch_add(requested as u64, Ordering::Relaxed);
        self.frames_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        if delivered < requested {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> OutputStatsSnapshot {
        OutputStatsSnapshot {
            pulls: self.pulls.load(Ordering::Relaxed),
            frames_requested: self.frames_requested.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}

/// Host-thread handle that drains mixed audio from the master queue.
///
/// Cheap to clone and `Send`, so it can be moved into an audio callback.
#[derive(Clone)]
pub struct OutputPuller {
    consumer: SharedConsumer,
    stats: Arc<OutputStats>,
}

impl OutputPuller {
    pub(crate) fn new(consumer: SharedConsumer, stats: Arc<OutputStats>) -> Self {
        Self { consumer, stats }
    }

    /// Fill `out` (interleaved stereo, `out.len() / 2` frames) from the
    /// master queue.
    ///
    /// Returns the number of good frames delivered: the full frame count when
    /// enough audio was mixed, otherwise the frames that were available. The
    /// rest of `out` is zeroed. Never blocks; if the queue is momentarily
    /// held by a save/restore the whole buffer is silence and 0 is returned.
    pub fn pull(&self, out: &mut [i16]) -> usize {
        let frames = out.len() / 2;
        let wanted = frames * 2;

        let popped = match self.consumer.try_lock() {
            Ok(mut consumer) => queue::pop_with(&mut *consumer, wanted, |segment, offset| {
                out[offset..offset + segment.len()].copy_from_slice(segment);
            }),
            Err(_) => {
                debug!("master queue busy, delivering silence");
                0
            }
        };
        out[popped..].fill(0);

        let delivered = if popped < wanted { popped / 2 } else { frames };
        self.stats.record(frames, delivered);
        delivered
    }

    /// Host-side counters.
    pub fn stats(&self) -> OutputStatsSnapshot {
        self.stats.snapshot()
    }
}
