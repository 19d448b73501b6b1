//! Errors raised while validating daemon configuration.

use std::io;
use std::path::PathBuf;

use nix::sys::signal::Signal;
use thiserror::Error;

/// Fatal configuration problems surfaced before any process is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No daemon name was supplied.
    #[error("daemon name must be provided")]
    MissingName,
    /// The working path does not exist.
    #[error("path '{path}' does not exist")]
    MissingPath {
        /// Configured working path.
        path: PathBuf,
    },
    /// The working path exists but is not a directory.
    #[error("path '{path}' is not a directory")]
    NotADirectory {
        /// Configured working path.
        path: PathBuf,
    },
    /// The working path is not both readable and writable.
    #[error("path '{path}' must be readable and writable: {source}")]
    PathAccess {
        /// Configured working path.
        path: PathBuf,
        /// Underlying access failure.
        #[source]
        source: io::Error,
    },
    /// The stop signal identifier could not be resolved.
    #[error("unknown stop signal '{raw}'")]
    UnknownSignal {
        /// Identifier as supplied.
        raw: String,
    },
    /// The stop signal cannot be caught, so the worker could not handle it.
    #[error("stop signal {signal} cannot be handled by the worker")]
    ForbiddenSignal {
        /// Signal that was requested.
        signal: Signal,
    },
    /// A parent directory for the pid or log file could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A configuration document was malformed.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The callback table has no start callback.
    #[error("a start callback must be registered before the daemon can start")]
    MissingStartCallback,
}
