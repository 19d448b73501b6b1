//! Supervision of a single named background process through a pid file.
//!
//! A [`Control`] starts a user-defined [`Daemon`] as a detached worker,
//! records its pid, and later stops, restarts, kills, or queries it. The
//! daemon's behaviour is supplied as lifecycle callbacks registered in a
//! [`CallbackTable`]:
//!
//! * `BeforeStart` and `Start` run inside the worker.
//! * `Stop` runs when a stop is requested, in the controller and, when the
//!   worker exits on its stop signal, in the worker too.
//! * `AfterStop` runs in the controller once the stop sequence completes.
//! * `Error` runs after any fault and increments the error counter.
//!
//! Configuration lives in [`pidctl_config`]; process plumbing sits behind the
//! [`Launcher`] and [`Signaller`] traits so controllers can be exercised
//! without forking.

pub mod callbacks;
mod control;
mod error;
mod messages;
mod pid_file;
pub mod process;
pub mod telemetry;
mod worker;

pub use callbacks::{
    Callback, CallbackError, CallbackTable, CallbackTableBuilder, Context, Daemon, Fault,
    HookResult, Method, Phase,
};
pub use control::{Collaborators, Control, DEFAULT_POLL_INTERVAL, DaemonStatus};
pub use error::ControlError;
pub use messages::{MessageLevel, MessageLog};
pub use pid_file::{PidFile, PidFileError};
pub use process::{ForkLauncher, LaunchError, Launcher, Liveness, Signaller, SystemSignaller};

pub(crate) const CONTROL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::control");
pub(crate) const CALLBACK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::callbacks");
pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");

#[cfg(test)]
mod tests;
