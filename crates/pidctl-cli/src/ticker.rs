//! The demonstration daemon driven by the CLI.
//!
//! The worker's standard streams point at the log file, so everything the
//! callbacks write ends up there.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pidctl::{Callback, CallbackError, CallbackTable, Context, Daemon, Fault, HookResult, Method};

const SLICE: Duration = Duration::from_millis(100);

/// Writes a numbered line to stdout at a fixed interval until stopped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ticker {
    interval: Duration,
}

impl Ticker {
    pub(crate) const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    fn announce(context: &Context<'_, Self>) -> HookResult {
        let pid = context.pid().unwrap_or_default();
        emit(&format!("{} starting as pid {pid}", context.name()))
    }

    fn tick(context: &Context<'_, Self>) -> HookResult {
        let interval = context.daemon().interval;
        let mut count: u64 = 0;
        while !context.stop_requested() {
            count = count.saturating_add(1);
            emit(&format!("tick {count}"))?;
            nap(context, interval);
        }
        Ok(())
    }

    fn farewell(context: &Context<'_, Self>) -> HookResult {
        emit(&format!("{} stopping", context.name()))
    }
}

impl Daemon for Ticker {
    fn method(name: &str) -> Option<Method<Self>> {
        match name {
            "announce" => Some(Self::announce),
            "tick" => Some(Self::tick),
            "farewell" => Some(Self::farewell),
            _ => None,
        }
    }
}

/// Sleeps for `interval` in short slices so stop requests are noticed.
fn nap(context: &Context<'_, Ticker>, interval: Duration) {
    let mut remaining = interval;
    while !remaining.is_zero() && !context.stop_requested() {
        let slice = remaining.min(SLICE);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

fn emit(line: &str) -> HookResult {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")
        .and_then(|()| stdout.flush())
        .map_err(|error| Fault::with_source("failed to write ticker output", error))
}

/// Callback table for the ticker.
pub(crate) fn callbacks() -> Result<Arc<CallbackTable<Ticker>>, CallbackError> {
    CallbackTable::builder()
        .before_start(Callback::named("announce"))
        .start(Callback::named("tick"))
        .stop(Callback::named("farewell"))
        .error(Callback::inline(|context: &Context<'_, Ticker>| {
            let mut stderr = io::stderr().lock();
            writeln!(
                stderr,
                "{} recorded error #{}",
                context.name(),
                context.error_count()
            )
            .map_err(|error| Fault::with_source("failed to report error", error))
        }))
        .build()
        .map(Arc::new)
}
