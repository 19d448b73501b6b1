//! Errors surfaced by controller operations.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use pidctl_config::ConfigError;
use thiserror::Error;

use crate::callbacks::CallbackError;
use crate::pid_file::PidFileError;

/// Fatal failures returned by [`Control`](crate::Control) operations.
///
/// Faults raised by callbacks and launch failures are not part of this type;
/// they are reported and routed to the `Error` callback instead.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Configuration or callback validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A callback could not be resolved.
    #[error(transparent)]
    Callback(#[from] CallbackError),
    /// The pid file could not be maintained.
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    /// A signal could not be delivered to a live worker.
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        /// Target pid.
        pid: u32,
        /// Signal that was being sent.
        signal: Signal,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// The log file could not be removed.
    #[error("failed to remove log file '{path}': {source}")]
    RemoveLog {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
