//! Headless collaborators
//!
//! Self-contained guest memory, scheduler, virtual clock and host sinks.
//! They drive the engine in tests and in the command-line renderer, where no
//! emulated CPU exists.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use tracing::trace;

use crate::kernel::{ThreadId, ThreadScheduler, WaitType};
use crate::memory::GuestMemory;
use crate::output::HostAudio;
use crate::timing::{CoreTiming, EventId};

/// Emulated CPU clock used by default (222 MHz).
pub const DEFAULT_CYCLES_PER_SECOND: i64 = 222_000_000;

/// A single contiguous window of guest RAM.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    base: u32,
    data: Vec<u8>,
}

impl FlatMemory {
    /// Zeroed RAM of `size` bytes mapped at `base`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    fn offset(&self, address: u32) -> Option<usize> {
        let offset = address.checked_sub(self.base)? as usize;
        (offset < self.data.len()).then_some(offset)
    }

    /// Copy raw bytes into guest memory. Returns `false` if out of range.
    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> bool {
        let Some(offset) = self.offset(address) else {
            return false;
        };
        match self.data.get_mut(offset..offset + bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Store little-endian 16-bit samples.
    pub fn write_samples(&mut self, address: u32, samples: &[i16]) -> bool {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.write_bytes(address, &bytes)
    }
}

impl GuestMemory for FlatMemory {
    fn is_valid_address(&self, address: u32) -> bool {
        self.offset(address).is_some()
    }

    fn slice(&self, address: u32, len: usize) -> Option<&[u8]> {
        let offset = self.offset(address)?;
        self.data.get(offset..offset.checked_add(len)?)
    }
}

#[derive(Debug, Clone, Copy)]
struct WaitRecord {
    wait: WaitType,
    key: u32,
    value: u32,
    /// Order in which waits began
    serial: u64,
}

#[derive(Debug, Default)]
struct ThreadRecord {
    name: String,
    wait: Option<WaitRecord>,
    last_resume: Option<u32>,
}

/// Cooperative scheduler that records every wait and resume.
#[derive(Debug)]
pub struct HeadlessScheduler {
    threads: HashMap<ThreadId, ThreadRecord>,
    current: ThreadId,
    next_thread: u32,
    dispatch_enabled: bool,
    wait_serial: u64,
    reschedules: u64,
    resumed: Vec<(ThreadId, u32)>,
}

impl Default for HeadlessScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessScheduler {
    /// Scheduler with a single running "main" thread and dispatch enabled.
    pub fn new() -> Self {
        let mut scheduler = Self {
            threads: HashMap::new(),
            current: ThreadId(0),
            next_thread: 1,
            dispatch_enabled: true,
            wait_serial: 0,
            reschedules: 0,
            resumed: Vec::new(),
        };
        scheduler.current = scheduler.spawn_thread("main");
        scheduler
    }

    pub fn spawn_thread(&mut self, name: &str) -> ThreadId {
        let id = ThreadId(self.next_thread);
        self.next_thread += 1;
        self.threads.insert(
            id,
            ThreadRecord {
                name: name.to_string(),
                ..Default::default()
            },
        );
        id
    }

    pub fn set_current(&mut self, thread: ThreadId) {
        self.current = thread;
    }

    pub fn set_dispatch_enabled(&mut self, enabled: bool) {
        self.dispatch_enabled = enabled;
    }

    pub fn thread_name(&self, thread: ThreadId) -> Option<&str> {
        self.threads.get(&thread).map(|t| t.name.as_str())
    }

    pub fn is_waiting(&self, thread: ThreadId) -> bool {
        self.threads.get(&thread).is_some_and(|t| t.wait.is_some())
    }

    /// End a thread's wait without resuming it through the audio path, as a
    /// thread termination would. Returns `false` if it was not waiting.
    pub fn cancel_wait(&mut self, thread: ThreadId) -> bool {
        let cancelled = self
            .threads
            .get_mut(&thread)
            .and_then(|t| t.wait.take())
            .is_some();
        if cancelled {
            trace!("wait of thread {:?} cancelled", thread);
        }
        cancelled
    }

    /// Value the thread was last resumed with.
    pub fn resume_value(&self, thread: ThreadId) -> Option<u32> {
        self.threads.get(&thread).and_then(|t| t.last_resume)
    }

    /// Every resume so far, in order.
    pub fn resumed(&self) -> &[(ThreadId, u32)] {
        &self.resumed
    }

    /// Number of waits started so far.
    pub fn waits_started(&self) -> u64 {
        self.wait_serial
    }

    pub fn reschedule_count(&self) -> u64 {
        self.reschedules
    }

    /// Threads currently parked, oldest wait first.
    pub fn waiting_threads(&self) -> Vec<ThreadId> {
        let mut waiting: Vec<_> = self
            .threads
            .iter()
            .filter_map(|(&id, t)| t.wait.map(|w| (w.serial, id)))
            .collect();
        waiting.sort_unstable();
        waiting.into_iter().map(|(_, id)| id).collect()
    }
}

impl ThreadScheduler for HeadlessScheduler {
    fn is_dispatch_enabled(&self) -> bool {
        self.dispatch_enabled
    }

    fn current_thread(&self) -> ThreadId {
        self.current
    }

    fn wait_current_thread(
        &mut self,
        wait: WaitType,
        key: u32,
        return_value: u32,
        reason: &'static str,
    ) {
        self.wait_serial += 1;
        let record = WaitRecord {
            wait,
            key,
            value: return_value,
            serial: self.wait_serial,
        };
        trace!("thread {:?} waits on {:?} {} ({})", self.current, wait, key, reason);
        self.threads.entry(self.current).or_default().wait = Some(record);
    }

    fn wait_id(&self, thread: ThreadId, wait: WaitType) -> Option<u32> {
        self.threads
            .get(&thread)?
            .wait
            .filter(|record| record.wait == wait)
            .map(|record| record.key)
    }

    fn wait_value(&self, thread: ThreadId) -> Option<u32> {
        self.threads.get(&thread)?.wait.map(|record| record.value)
    }

    fn resume_thread_from_wait(&mut self, thread: ThreadId, value: u32) {
        if let Some(record) = self.threads.get_mut(&thread) {
            record.wait = None;
            record.last_resume = Some(value);
            self.resumed.push((thread, value));
        }
    }

    fn reschedule(&mut self, reason: &'static str) {
        trace!("reschedule: {}", reason);
        self.reschedules += 1;
    }
}

/// Virtual cycle clock with a named event table.
#[derive(Debug)]
pub struct HeadlessClock {
    cycles_per_second: i64,
    now: i64,
    names: HashMap<EventId, &'static str>,
    next_id: i32,
    pending: BinaryHeap<Reverse<(i64, u64, EventId)>>,
    sequence: u64,
}

impl Default for HeadlessClock {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLES_PER_SECOND)
    }
}

impl HeadlessClock {
    pub fn new(cycles_per_second: i64) -> Self {
        Self {
            cycles_per_second: cycles_per_second.max(1),
            now: 0,
            names: HashMap::new(),
            next_id: 1,
            pending: BinaryHeap::new(),
            sequence: 0,
        }
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn cycles_per_second(&self) -> i64 {
        self.cycles_per_second
    }

    /// Change the clock rate. Already scheduled events keep their cycle time.
    pub fn set_cycles_per_second(&mut self, cycles_per_second: i64) {
        self.cycles_per_second = cycles_per_second.max(1);
    }

    pub fn event_name(&self, id: EventId) -> Option<&'static str> {
        self.names.get(&id).copied()
    }

    /// Number of scheduled events not yet fired.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Move time forward by `cycles` and return every event that came due,
    /// in firing order, with how many cycles late it is at the new time.
    ///
    /// Events re-armed by the caller are not fired within the same call.
    pub fn advance(&mut self, cycles: i64) -> Vec<(EventId, i64)> {
        self.now += cycles.max(0);
        let mut fired = Vec::new();
        while let Some(&Reverse((at, _, id))) = self.pending.peek() {
            if at > self.now {
                break;
            }
            self.pending.pop();
            fired.push((id, self.now - at));
        }
        fired
    }

    /// Move time forward by `cycles`, firing events exactly on time.
    ///
    /// `dispatch` runs with the clock at each event's time, so events it
    /// re-arms inside the window fire in the same call.
    pub fn run_for<F>(&mut self, cycles: i64, mut dispatch: F)
    where
        F: FnMut(&mut Self, EventId, i64),
    {
        let target = self.now + cycles.max(0);
        while let Some(&Reverse((at, _, id))) = self.pending.peek() {
            if at > target {
                break;
            }
            self.pending.pop();
            self.now = self.now.max(at);
            dispatch(self, id, 0);
        }
        self.now = target;
    }
}

impl CoreTiming for HeadlessClock {
    fn register_event(&mut self, name: &'static str) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.names.insert(id, name);
        id
    }

    fn restore_register_event(&mut self, id: EventId, name: &'static str) {
        self.names.insert(id, name);
        self.next_id = self.next_id.max(id.0 + 1);
    }

    fn schedule_event(&mut self, cycles: i64, id: EventId) {
        self.sequence += 1;
        self.pending
            .push(Reverse((self.now + cycles.max(0), self.sequence, id)));
    }

    fn us_to_cycles(&self, us: i64) -> i64 {
        us * self.cycles_per_second / 1_000_000
    }
}

/// Host backend that ignores pokes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl HostAudio for NullHost {
    fn update_sound(&mut self) {}
}

/// Host backend that counts pokes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingHost {
    pub pokes: u64,
}

impl HostAudio for CountingHost {
    fn update_sound(&mut self) {
        self.pokes += 1;
    }
}
