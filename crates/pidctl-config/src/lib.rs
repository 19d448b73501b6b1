//! Configuration for `pidctl` daemons.
//!
//! [`DaemonOptions`] is the raw option bag; [`DaemonConfig::from_options`]
//! validates it once, derives the pid and log file locations, and resolves the
//! stop signal. Both the controlling process and the detached worker read the
//! same validated [`DaemonConfig`], so they always agree on where the pid file
//! lives.

mod defaults;
mod error;
mod logging;
mod options;
mod paths;
mod signal;

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use nix::unistd::{AccessFlags, access};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PATH, DEFAULT_SIGNAL, DEFAULT_TIMEOUT_SECONDS, LOG_DIRECTORY,
    PID_DIRECTORY, default_log_filter_string, default_log_format, default_path, default_signal,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};
pub use options::DaemonOptions;
pub use paths::DaemonPaths;
pub use signal::{StopSignal, StopSignalAction, is_catchable};

/// Validated configuration for a single daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    name: String,
    paths: DaemonPaths,
    sync_log: bool,
    allow_multiple: bool,
    stop_signal: StopSignal,
    timeout: Duration,
    verbose: bool,
    logging_enabled: bool,
    stop_signal_action: StopSignalAction,
    kill_dispatches_after_stop: bool,
    kill_dispatches_error: bool,
    log_filter: String,
    log_format: LogFormat,
}

impl DaemonConfig {
    /// Validates raw options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the name is missing or blank, when the
    /// working path is missing, not a directory, or not readable and writable,
    /// or when the stop signal cannot be resolved or cannot be caught.
    pub fn from_options(options: DaemonOptions) -> Result<Self, ConfigError> {
        let name = options
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ConfigError::MissingName)?;
        validate_work_dir(&options.path)?;
        let stop_signal = options.signal.parse::<StopSignal>()?;
        let paths = DaemonPaths::derive(
            &name,
            &options.path,
            options.pid_file.as_deref(),
            options.log_file.as_deref(),
        );
        Ok(Self {
            name,
            paths,
            sync_log: options.sync_log,
            allow_multiple: options.allow_multiple,
            stop_signal,
            timeout: Duration::from_secs(options.timeout_seconds),
            verbose: options.verbose,
            logging_enabled: options.logging_enabled,
            stop_signal_action: options.stop_signal_action,
            kill_dispatches_after_stop: options.kill_dispatches_after_stop,
            kill_dispatches_error: options.kill_dispatches_error,
            log_filter: options.log_filter,
            log_format: options.log_format,
        })
    }

    /// Unique daemon name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived filesystem locations.
    #[must_use]
    pub const fn paths(&self) -> &DaemonPaths {
        &self.paths
    }

    /// Working directory of the worker.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        self.paths.work_dir()
    }

    /// Pid file location.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.paths.pid_path()
    }

    /// Log file location.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.paths.log_path()
    }

    /// Whether the log file is opened for synchronous writes.
    #[must_use]
    pub const fn sync_log(&self) -> bool {
        self.sync_log
    }

    /// Whether a second instance may start while one is recorded as running.
    #[must_use]
    pub const fn allow_multiple(&self) -> bool {
        self.allow_multiple
    }

    /// Signal used for the graceful stop request.
    #[must_use]
    pub const fn stop_signal(&self) -> StopSignal {
        self.stop_signal
    }

    /// Grace period before a forced kill.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether status messages are echoed to stdout.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether the worker's standard streams are redirected into the log.
    #[must_use]
    pub const fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }

    /// Worker reaction to the stop signal.
    #[must_use]
    pub const fn stop_signal_action(&self) -> StopSignalAction {
        self.stop_signal_action
    }

    /// Whether `kill()` dispatches the after-stop callback.
    #[must_use]
    pub const fn kill_dispatches_after_stop(&self) -> bool {
        self.kill_dispatches_after_stop
    }

    /// Whether `kill()` dispatches the error callback.
    #[must_use]
    pub const fn kill_dispatches_error(&self) -> bool {
        self.kill_dispatches_error
    }

    /// Telemetry filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Telemetry output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Creates the pid and log parent directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CreateDirectory`] when a directory cannot be
    /// created.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        self.paths.ensure_directories()
    }
}

fn validate_work_dir(path: &Path) -> Result<(), ConfigError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingPath {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ConfigError::PathAccess {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(ConfigError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    access(path, AccessFlags::R_OK | AccessFlags::W_OK).map_err(|errno| {
        ConfigError::PathAccess {
            path: path.to_path_buf(),
            source: io::Error::from(errno),
        }
    })
}
