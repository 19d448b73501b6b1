//! A daemon whose callbacks record what happened to them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::callbacks::{Callback, CallbackTable, Context, Daemon, Fault, HookResult, Method};

const SPIN: Duration = Duration::from_millis(5);

/// How the `serve` method behaves once invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartMode {
    /// Return immediately.
    Return,
    /// Loop until the stop flag is raised.
    UntilStopped,
    /// Loop until the test releases the daemon, ignoring stop requests.
    IgnoreStop,
    /// Fail with a fault.
    Fail,
    /// Panic.
    Panic,
}

#[derive(Debug)]
pub(crate) struct TestDaemon {
    events: Mutex<Vec<String>>,
    release: AtomicBool,
    mode: StartMode,
    failing_stop: bool,
    failing_error: bool,
}

impl TestDaemon {
    pub(crate) fn new(mode: StartMode) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            release: AtomicBool::new(false),
            mode,
            failing_stop: false,
            failing_error: false,
        }
    }

    pub(crate) fn with_failing_stop(mut self) -> Self {
        self.failing_stop = true;
        self
    }

    pub(crate) fn with_failing_error(mut self) -> Self {
        self.failing_error = true;
        self
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|entry| *entry == event).count()
    }

    pub(crate) fn saw(&self, event: &str) -> bool {
        self.count(event) > 0
    }

    /// Lets every looping `serve` call return.
    pub(crate) fn release(&self) {
        self.release.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().expect("events lock").push(event.into());
    }

    fn released(&self) -> bool {
        self.release.load(Ordering::SeqCst)
    }

    fn prepare(context: &Context<'_, Self>) -> HookResult {
        context.daemon().record("before_start");
        Ok(())
    }

    fn serve(context: &Context<'_, Self>) -> HookResult {
        let daemon = context.daemon();
        daemon.record("start");
        match daemon.mode {
            StartMode::Return => Ok(()),
            StartMode::Fail => Err(Fault::new("start refused")),
            StartMode::Panic => panic!("start exploded"),
            StartMode::UntilStopped => {
                while !daemon.released() && !context.stop_requested() {
                    thread::sleep(SPIN);
                }
                Ok(())
            }
            StartMode::IgnoreStop => {
                while !daemon.released() {
                    thread::sleep(SPIN);
                }
                Ok(())
            }
        }
    }

    fn halt(context: &Context<'_, Self>) -> HookResult {
        let daemon = context.daemon();
        daemon.record("stop");
        if daemon.failing_stop {
            return Err(Fault::new("stop refused"));
        }
        Ok(())
    }

    fn wrap_up(context: &Context<'_, Self>) -> HookResult {
        context.daemon().record("after_stop");
        Ok(())
    }

    fn alarm(context: &Context<'_, Self>) -> HookResult {
        let daemon = context.daemon();
        daemon.record(format!("error:{}", context.error_count()));
        if daemon.failing_error {
            return Err(Fault::new("alarm bell broken"));
        }
        Ok(())
    }
}

impl Daemon for TestDaemon {
    fn method(name: &str) -> Option<Method<Self>> {
        match name {
            "prepare" => Some(Self::prepare),
            "serve" => Some(Self::serve),
            "halt" => Some(Self::halt),
            "wrap_up" => Some(Self::wrap_up),
            "alarm" => Some(Self::alarm),
            _ => None,
        }
    }
}

/// Registers every recording method, mixing named and inline callbacks.
pub(crate) fn test_callbacks() -> Arc<CallbackTable<TestDaemon>> {
    let table = CallbackTable::builder()
        .before_start(Callback::named("prepare"))
        .start(Callback::named("serve"))
        .stop(Callback::named("halt"))
        .after_stop(Callback::inline(TestDaemon::wrap_up))
        .error(Callback::named("alarm"))
        .build()
        .expect("test callbacks resolve");
    Arc::new(table)
}
