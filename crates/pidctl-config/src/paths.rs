//! Derives the pid and log file locations for a named daemon.
//!
//! The controller and the detached worker must agree on where the pid file
//! lives, so both derive it from the same configuration. Parent directories are
//! created on demand by [`DaemonPaths::ensure_directories`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::ConfigError;
use crate::defaults::{LOG_DIRECTORY, PID_DIRECTORY};

/// Canonical filesystem locations used by one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPaths {
    work_dir: PathBuf,
    pid_path: PathBuf,
    log_path: PathBuf,
}

impl DaemonPaths {
    /// Derives `work_dir/pids/{name}.pid` and `work_dir/logs/{name}.log`,
    /// honouring explicit overrides.
    #[must_use]
    pub fn derive(
        name: &str,
        work_dir: &Path,
        pid_override: Option<&Path>,
        log_override: Option<&Path>,
    ) -> Self {
        let pid_path = pid_override.map_or_else(
            || work_dir.join(PID_DIRECTORY).join(format!("{name}.pid")),
            Path::to_path_buf,
        );
        let log_path = log_override.map_or_else(
            || work_dir.join(LOG_DIRECTORY).join(format!("{name}.log")),
            Path::to_path_buf,
        );
        Self {
            work_dir: work_dir.to_path_buf(),
            pid_path,
            log_path,
        }
    }

    /// Directory the worker changes into after detaching.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        self.work_dir.as_path()
    }

    /// Path to the pid file.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the append-only daemon log.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }

    /// Creates the parent directories of the pid and log files.
    ///
    /// Safe to call repeatedly; existing directories are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CreateDirectory`] naming the directory that
    /// could not be created.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for file in [self.pid_path(), self.log_path()] {
            let Some(parent) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
                continue;
            };
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}
