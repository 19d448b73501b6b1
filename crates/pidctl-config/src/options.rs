//! Raw option bag accepted by [`crate::DaemonConfig::from_options`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::defaults::{
    DEFAULT_TIMEOUT_SECONDS, default_log_filter_string, default_log_format, default_path,
    default_signal,
};
use crate::logging::LogFormat;
use crate::signal::StopSignalAction;

/// Unvalidated daemon options, typically built in code or read from TOML.
///
/// Omitted fields take the values documented in [`crate::defaults`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonOptions {
    /// Unique daemon name; required.
    pub name: Option<String>,
    /// Working directory; must exist and be readable and writable.
    pub path: PathBuf,
    /// Explicit pid file location.
    pub pid_file: Option<PathBuf>,
    /// Explicit log file location.
    pub log_file: Option<PathBuf>,
    /// Open the log file for synchronous writes.
    pub sync_log: bool,
    /// Permit starting while another instance is recorded as running.
    pub allow_multiple: bool,
    /// Stop signal identifier.
    pub signal: String,
    /// Seconds to wait for a graceful stop before forcing a kill.
    pub timeout_seconds: u64,
    /// Echo status messages to stdout.
    pub verbose: bool,
    /// Redirect the worker's standard streams into the log file.
    pub logging_enabled: bool,
    /// Worker reaction to the stop signal.
    pub stop_signal_action: StopSignalAction,
    /// Dispatch the after-stop callback from `kill()`.
    pub kill_dispatches_after_stop: bool,
    /// Dispatch the error callback from `kill()`.
    pub kill_dispatches_error: bool,
    /// Telemetry filter expression.
    pub log_filter: String,
    /// Telemetry output format.
    pub log_format: LogFormat,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            name: None,
            path: default_path(),
            pid_file: None,
            log_file: None,
            sync_log: true,
            allow_multiple: false,
            signal: default_signal(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            verbose: false,
            logging_enabled: true,
            stop_signal_action: StopSignalAction::default(),
            kill_dispatches_after_stop: false,
            kill_dispatches_error: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl DaemonOptions {
    /// Starts from the defaults with the given daemon name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parses options from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { source })
    }

    /// Reads and parses options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents are malformed.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
