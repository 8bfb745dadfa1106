//! Emulated kernel scheduler interface
//!
//! Blocking submissions never block a host thread. The engine registers a
//! wait record on the channel and asks the scheduler to park the calling
//! virtual thread; a later mix tick resumes it through this trait.

/// Handle of a virtual thread in the emulated kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

/// Kind of wait a virtual thread is parked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WaitType {
    /// Waiting for an audio channel queue to drain (key = channel index + 1)
    AudioChannel,
}

/// Cooperative scheduler capabilities used by the submission engine.
pub trait ThreadScheduler {
    /// Whether the running thread may be suspended right now.
    fn is_dispatch_enabled(&self) -> bool;

    /// The virtual thread currently executing.
    fn current_thread(&self) -> ThreadId;

    /// Park the current thread. `return_value` is delivered when it resumes
    /// unless the resumer overrides it.
    fn wait_current_thread(
        &mut self,
        wait: WaitType,
        key: u32,
        return_value: u32,
        reason: &'static str,
    );

    /// Key of the wait `thread` is currently parked in, if it is parked in a
    /// wait of kind `wait`. `None` once the wait ended or was cancelled.
    fn wait_id(&self, thread: ThreadId, wait: WaitType) -> Option<u32>;

    /// Return value remembered when `thread` started waiting.
    fn wait_value(&self, thread: ThreadId) -> Option<u32>;

    /// Resume a parked thread with `value` as its syscall result.
    fn resume_thread_from_wait(&mut self, thread: ThreadId, value: u32);

    /// Request a scheduling pass so resumed threads run promptly.
    fn reschedule(&mut self, reason: &'static str);
}
