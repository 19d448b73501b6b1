//! Default values applied to omitted daemon options.

use std::path::PathBuf;

use crate::logging::LogFormat;

/// Working directory used when no path is configured.
pub const DEFAULT_PATH: &str = "/tmp";

/// Stop signal identifier sent by `stop()` unless overridden.
pub const DEFAULT_SIGNAL: &str = "TERM";

/// Seconds `stop()` waits for a graceful exit before forcing a kill.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Default log filter expression for structured telemetry.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory, relative to the working path, holding pid files.
pub const PID_DIRECTORY: &str = "pids";

/// Directory, relative to the working path, holding log files.
pub const LOG_DIRECTORY: &str = "logs";

/// Working directory used when no path is configured.
#[must_use]
pub fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_PATH)
}

/// Owned stop signal identifier used where allocation is required (e.g. serde).
#[must_use]
pub fn default_signal() -> String {
    DEFAULT_SIGNAL.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default structured log format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
