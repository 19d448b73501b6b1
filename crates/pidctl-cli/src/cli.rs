//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pidctl_config::{ConfigError, DaemonOptions, LogFormat};

/// Filter used when no configuration file sets one; keeps command output
/// free of routine telemetry.
const CLI_LOG_FILTER: &str = "warn";

/// Controls the bundled `ticker` demonstration daemon.
#[derive(Parser, Debug)]
#[command(name = "pidctl", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// TOML file holding daemon options; flags override its values.
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) config_path: Option<PathBuf>,
    /// Daemon name; also names the pid and log files.
    #[arg(long, global = true)]
    pub(crate) name: Option<String>,
    /// Working directory that holds the `pids/` and `logs/` folders.
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) path: Option<PathBuf>,
    /// Explicit pid file location.
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) pid_file: Option<PathBuf>,
    /// Explicit log file location.
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) log_file: Option<PathBuf>,
    /// Stop signal, by name or number.
    #[arg(long, global = true, value_name = "SIGNAL")]
    pub(crate) signal: Option<String>,
    /// Seconds to wait for a graceful stop before killing.
    #[arg(long, global = true, value_name = "SECONDS")]
    pub(crate) timeout: Option<u64>,
    /// Start even when an instance is already recorded as running.
    #[arg(long, global = true)]
    pub(crate) allow_multiple: bool,
    /// Telemetry filter expression.
    #[arg(long, global = true, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Telemetry output format (`json` or `compact`).
    #[arg(long, global = true, value_name = "FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
    /// Seconds between ticks written by the demonstration daemon.
    #[arg(long, global = true, value_name = "SECONDS", default_value_t = 1)]
    pub(crate) interval: u64,
    /// Suppress status messages.
    #[arg(long, short, global = true)]
    pub(crate) quiet: bool,
    /// Lifecycle action to perform.
    #[command(subcommand)]
    pub(crate) action: Action,
}

/// Lifecycle actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Start the daemon in the background.
    Start,
    /// Stop the daemon, killing it if it outlives the timeout.
    Stop,
    /// Stop and then start the daemon.
    Restart,
    /// Report whether the daemon is running.
    Status,
    /// Kill the daemon without a graceful phase.
    Kill {
        /// Leave the pid file in place.
        #[arg(long)]
        keep_pid_file: bool,
    },
    /// Remove the daemon's log and pid files.
    Clean,
}

impl Cli {
    /// Merges the configuration file, if any, with command-line overrides.
    pub(crate) fn options(&self) -> Result<DaemonOptions, ConfigError> {
        let mut options = match &self.config_path {
            Some(path) => DaemonOptions::from_toml_file(path)?,
            None => DaemonOptions {
                log_filter: String::from(CLI_LOG_FILTER),
                ..DaemonOptions::default()
            },
        };
        if let Some(name) = &self.name {
            options.name = Some(name.clone());
        }
        if let Some(path) = &self.path {
            options.path.clone_from(path);
        }
        if let Some(pid_file) = &self.pid_file {
            options.pid_file = Some(pid_file.clone());
        }
        if let Some(log_file) = &self.log_file {
            options.log_file = Some(log_file.clone());
        }
        if let Some(signal) = &self.signal {
            options.signal.clone_from(signal);
        }
        if let Some(timeout) = self.timeout {
            options.timeout_seconds = timeout;
        }
        if self.allow_multiple {
            options.allow_multiple = true;
        }
        if let Some(filter) = &self.log_filter {
            options.log_filter.clone_from(filter);
        }
        if let Some(format) = self.log_format {
            options.log_format = format;
        }
        Ok(options)
    }
}
