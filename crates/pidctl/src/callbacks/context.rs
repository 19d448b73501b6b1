use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::Phase;

/// Count of `Error` dispatches observed by one process.
///
/// The counter is cloned into the worker at launch; after a fork each side
/// keeps its own tally.
#[derive(Debug, Clone, Default)]
pub struct ErrorCounter(Arc<AtomicU64>);

impl ErrorCounter {
    /// Builds an independent counter seeded with `value`.
    #[must_use]
    pub fn starting_at(value: u64) -> Self {
        Self(Arc::new(AtomicU64::new(value)))
    }

    /// Increments the counter and returns the new value.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Flag raised when the worker receives its stop signal.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Marks the stop as requested.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Reports whether a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a dispatch needs to build a [`Context`].
#[derive(Debug)]
pub struct Receiver<'a, D> {
    /// User daemon that callbacks are invoked against.
    pub daemon: &'a D,
    /// Daemon name.
    pub name: &'a str,
    /// Pid of the worker, when known.
    pub pid: Option<u32>,
    /// Error counter for the current process.
    pub errors: &'a ErrorCounter,
    /// Stop flag for the current process.
    pub stop: &'a StopFlag,
}

/// View handed to every callback invocation.
#[derive(Debug)]
pub struct Context<'a, D> {
    daemon: &'a D,
    name: &'a str,
    pid: Option<u32>,
    error_count: u64,
    phase: Phase,
    stop: &'a StopFlag,
}

impl<'a, D> Context<'a, D> {
    pub(crate) fn new(receiver: &Receiver<'a, D>, phase: Phase) -> Self {
        Self {
            daemon: receiver.daemon,
            name: receiver.name,
            pid: receiver.pid,
            error_count: receiver.errors.get(),
            phase,
            stop: receiver.stop,
        }
    }

    /// The user daemon the callback belongs to.
    #[must_use]
    pub const fn daemon(&self) -> &'a D {
        self.daemon
    }

    /// Name of the supervised daemon.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Worker pid as known by the dispatching process.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Error dispatches counted so far, including the current one.
    #[must_use]
    pub const fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Phase being dispatched.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the worker has received its stop signal.
    ///
    /// Long-running `Start` callbacks poll this to leave their loop when the
    /// stop signal is configured to be recorded rather than to exit.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_clones_share_state() {
        let counter = ErrorCounter::default();
        let clone = counter.clone();
        assert_eq!(clone.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(clone.get(), 2);
    }

    #[test]
    fn seeded_counter_is_independent() {
        let original = ErrorCounter::default();
        original.increment();
        let seeded = ErrorCounter::starting_at(original.get());
        seeded.increment();
        assert_eq!(original.get(), 1);
        assert_eq!(seeded.get(), 2);
    }
}
