//! Detaching steps applied inside the worker.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::libc::O_SYNC;

use super::environment::Environment;
use super::errors::LaunchError;

const NULL_DEVICE: &str = "/dev/null";

/// Files the worker's standard streams are pointed at.
///
/// Both files are opened by the controller so that failures surface there
/// rather than inside a detached process.
#[derive(Debug)]
pub struct StdioRedirect {
    input: File,
    output: File,
}

impl StdioRedirect {
    /// Opens `/dev/null` for input and `log_path` for appending.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::OpenLog`] or [`LaunchError::OpenNull`] when a
    /// file cannot be opened.
    pub fn open(log_path: &Path, sync: bool) -> Result<Self, LaunchError> {
        let input = File::open(NULL_DEVICE).map_err(|source| LaunchError::OpenNull { source })?;
        let mut options = OpenOptions::new();
        options.append(true).create(true).mode(0o644);
        if sync {
            options.custom_flags(O_SYNC);
        }
        let output = options
            .open(log_path)
            .map_err(|source| LaunchError::OpenLog {
                path: log_path.to_path_buf(),
                source,
            })?;
        Ok(Self { input, output })
    }
}

/// Ordered detaching plan: change directory, clear the umask, then redirect
/// the standard streams when logging is enabled.
#[derive(Debug)]
pub struct Daemonize {
    work_dir: PathBuf,
    stdio: Option<StdioRedirect>,
}

impl Daemonize {
    /// Plans a detach into `work_dir` that leaves the streams untouched.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            stdio: None,
        }
    }

    /// Adds stream redirection to the plan.
    #[must_use]
    pub fn with_stdio(mut self, stdio: StdioRedirect) -> Self {
        self.stdio = Some(stdio);
        self
    }

    /// Working directory the worker moves into.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Applies each step to `environment`.
    ///
    /// # Errors
    ///
    /// Returns the first IO error raised by the environment.
    pub fn apply(&self, environment: &mut dyn Environment) -> io::Result<()> {
        environment.change_dir(&self.work_dir)?;
        environment.reset_umask();
        if let Some(stdio) = &self.stdio {
            environment.redirect_stdio(&stdio.input, &stdio.output)?;
        }
        Ok(())
    }
}
