//! Process-level side effects performed inside the worker.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;

use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::Signal;
use nix::sys::stat::{Mode, umask};
use nix::unistd::{chdir, dup2};
use pidctl_config::is_catchable;
use signal_hook::iterator::Signals;
use tracing::{info, warn};

use super::PROCESS_TARGET;

/// What the worker should do after its stop handler has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Terminate the worker with a success status.
    Exit,
    /// Keep running.
    Continue,
}

/// Handler invoked whenever the stop signal arrives.
pub type StopHandler = Arc<dyn Fn() -> StopOutcome + Send + Sync>;

/// Side effects the worker performs on its own process.
pub trait Environment {
    /// Pid of the current process.
    fn pid(&self) -> u32;

    /// Changes the working directory.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    fn change_dir(&mut self, path: &Path) -> io::Result<()>;

    /// Clears the file-mode creation mask.
    fn reset_umask(&mut self);

    /// Points stdin at `input` and both stdout and stderr at `output`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    fn redirect_stdio(&mut self, input: &File, output: &File) -> io::Result<()>;

    /// Installs `handler` for `signal`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the handler cannot be installed.
    fn on_stop_signal(&mut self, signal: Signal, handler: StopHandler) -> io::Result<()>;

    /// Writes a diagnostic line to the worker's error stream.
    fn report(&mut self, message: &str);
}

/// [`Environment`] acting on the real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn pid(&self) -> u32 {
        process::id()
    }

    fn change_dir(&mut self, path: &Path) -> io::Result<()> {
        chdir(path).map_err(io::Error::from)
    }

    fn reset_umask(&mut self) {
        umask(Mode::empty());
    }

    fn redirect_stdio(&mut self, input: &File, output: &File) -> io::Result<()> {
        dup2(input.as_raw_fd(), STDIN_FILENO)?;
        dup2(output.as_raw_fd(), STDOUT_FILENO)?;
        dup2(output.as_raw_fd(), STDERR_FILENO)?;
        Ok(())
    }

    fn on_stop_signal(&mut self, signal: Signal, handler: StopHandler) -> io::Result<()> {
        if !is_catchable(signal) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{signal} cannot be caught"),
            ));
        }
        let mut signals = Signals::new([signal as i32])?;
        thread::Builder::new()
            .name(String::from("pidctl-stop"))
            .spawn(move || {
                for raw in signals.forever() {
                    info!(target: PROCESS_TARGET, signal = raw, "stop signal received");
                    if handler() == StopOutcome::Exit {
                        process::exit(0);
                    }
                }
            })?;
        Ok(())
    }

    fn report(&mut self, message: &str) {
        if let Err(error) = writeln!(io::stderr().lock(), "{message}") {
            warn!(target: PROCESS_TARGET, error = %error, "failed to write worker report");
        }
    }
}
