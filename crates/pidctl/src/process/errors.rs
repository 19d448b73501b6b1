//! Errors surfaced while spawning the worker process.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Failures raised by the controller while preparing or spawning a worker.
///
/// None of these abort the controller: `start` reports them and routes them
/// to the `Error` callback.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The pid hand-off pipe could not be created.
    #[error("failed to create pid pipe: {source}")]
    Pipe {
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// Forking failed.
    #[error("failed to fork worker: {source}")]
    Fork {
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// The detached worker never reported its pid.
    #[error("worker did not report its pid: {reason}")]
    Detach {
        /// Description of what went wrong.
        reason: String,
    },
    /// The log file could not be opened for appending.
    #[error("failed to open log file '{path}': {source}")]
    OpenLog {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The null device could not be opened.
    #[error("failed to open /dev/null: {source}")]
    OpenNull {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
