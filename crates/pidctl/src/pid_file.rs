//! Reading and writing the plain-text pid file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::PROCESS_TARGET;

/// Errors raised while maintaining the pid file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// Writing the pid failed.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing the pid file failed for a reason other than absence.
    #[error("failed to remove pid file '{path}': {source}")]
    Remove {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Location of the file holding the worker's decimal pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Wraps the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Pid file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether the file is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the recorded pid.
    ///
    /// Missing, unreadable, non-numeric, and non-positive contents all read
    /// as "no pid".
    #[must_use]
    pub fn read(&self) -> Option<u32> {
        let contents = fs::read_to_string(&self.path).ok()?;
        contents
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|pid| *pid > 0)
    }

    /// Records `pid`, replacing any previous contents atomically.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Write`] when the file cannot be written.
    pub fn write(&self, pid: u32) -> Result<(), PidFileError> {
        atomic_write(&self.path, pid.to_string().as_bytes()).map_err(|source| {
            PidFileError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path.display(),
            "pid file written"
        );
        Ok(())
    }

    /// Deletes the file; absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Remove`] for any failure other than the file
    /// already being gone.
    pub fn remove(&self) -> Result<(), PidFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(
                    target: PROCESS_TARGET,
                    file = %self.path.display(),
                    "pid file removed"
                );
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PidFileError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Writes the provided bytes to the path using an atomic persist step.
///
/// Data is flushed and fsync'd before the temporary file is renamed into
/// place so readers never observe a partially written pid.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "pid file path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(".pidctl-");
    #[cfg(unix)]
    {
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
