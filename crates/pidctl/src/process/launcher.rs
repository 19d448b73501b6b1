//! Spawning the detached worker.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::OwnedFd;
use std::process;

use nix::sys::wait::waitpid;
use nix::libc;
use nix::unistd::{ForkResult, Pid, fork, pipe, setsid};
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::environment::{Environment, SystemEnvironment};
use super::errors::LaunchError;

/// Exit status of an intermediate child that failed to detach.
const EXIT_DETACH_FAILED: i32 = 70;

/// Work executed inside the worker; the return value becomes its exit status.
pub type WorkerTask = Box<dyn FnOnce(&mut dyn Environment) -> i32 + Send>;

/// Starts a worker and reports its pid.
pub trait Launcher: Send + Sync {
    /// Runs `task` in a new, detached worker and returns the worker's pid.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the worker cannot be spawned or its pid
    /// cannot be learnt.
    fn launch(&self, task: WorkerTask) -> Result<u32, LaunchError>;
}

/// [`Launcher`] using the double-fork pattern.
///
/// The controller forks an intermediate child, which starts a new session and
/// forks the worker. The intermediate writes the worker pid into a pipe and
/// exits immediately, so the worker is re-parented and can never reacquire a
/// controlling terminal. The controller reaps the intermediate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkLauncher;

impl Launcher for ForkLauncher {
    fn launch(&self, task: WorkerTask) -> Result<u32, LaunchError> {
        let (read_end, write_end) = pipe().map_err(|source| LaunchError::Pipe { source })?;
        // SAFETY: the child never returns into the caller; it either runs the
        // worker task and exits or leaves through `leave`.
        match unsafe { fork() }.map_err(|source| LaunchError::Fork { source })? {
            ForkResult::Parent { child } => {
                drop(write_end);
                drop(task);
                let reported = read_reported_pid(read_end);
                reap(child);
                let pid = reported?;
                info!(target: PROCESS_TARGET, pid, "worker detached");
                Ok(pid)
            }
            ForkResult::Child => {
                drop(read_end);
                detach(write_end, task)
            }
        }
    }
}

fn detach(write_end: OwnedFd, task: WorkerTask) -> ! {
    if setsid().is_err() {
        leave(EXIT_DETACH_FAILED);
    }
    // SAFETY: see `ForkLauncher::launch`.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            let mut pipe = File::from(write_end);
            let status = match pipe.write_all(child.as_raw().to_string().as_bytes()) {
                Ok(()) => 0,
                Err(_) => EXIT_DETACH_FAILED,
            };
            leave(status)
        }
        Ok(ForkResult::Child) => {
            // The controller reads until every write end is closed.
            drop(write_end);
            let mut environment = SystemEnvironment;
            let status = task(&mut environment);
            process::exit(status)
        }
        Err(_) => leave(EXIT_DETACH_FAILED),
    }
}

/// Leaves a forked child without running the controller's exit handlers or
/// flushing buffers it inherited.
fn leave(status: i32) -> ! {
    // SAFETY: only called in a forked child, which owns nothing that needs
    // unwinding.
    unsafe { libc::_exit(status) }
}

fn read_reported_pid(read_end: OwnedFd) -> Result<u32, LaunchError> {
    let mut reported = String::new();
    File::from(read_end)
        .read_to_string(&mut reported)
        .map_err(|error| LaunchError::Detach {
            reason: error.to_string(),
        })?;
    reported
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or_else(|| LaunchError::Detach {
            reason: format!("intermediate process reported {:?}", reported.trim()),
        })
}

fn reap(child: Pid) {
    if let Err(error) = waitpid(child, None) {
        warn!(
            target: PROCESS_TARGET,
            pid = child.as_raw(),
            error = %error,
            "failed to reap intermediate process"
        );
    }
}
