//! Liveness probes and signal delivery.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

/// Delivers signals to processes by pid.
#[cfg_attr(test, mockall::automock)]
pub trait Signaller: Send + Sync {
    /// Sends the null signal to check whether `pid` exists.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the probe.
    fn probe(&self, pid: u32) -> Result<(), Errno>;

    /// Delivers `signal` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the delivery.
    fn send(&self, pid: u32, signal: Signal) -> Result<(), Errno>;
}

/// [`Signaller`] backed by `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignaller;

impl Signaller for SystemSignaller {
    fn probe(&self, pid: u32) -> Result<(), Errno> {
        kill(to_pid(pid)?, None)?;
        if is_zombie(pid) {
            return Err(Errno::ESRCH);
        }
        Ok(())
    }

    fn send(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        kill(to_pid(pid)?, signal)
    }
}

fn to_pid(pid: u32) -> Result<Pid, Errno> {
    i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
        .ok_or(Errno::ESRCH)
}

// A zombie still answers the null signal but will never run again.
#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            stat.rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Outcome of probing a pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The process exists and accepts our signals.
    Alive,
    /// No such process.
    Gone,
    /// The process exists but belongs to someone else.
    Forbidden,
    /// The probe failed for another reason.
    Unknown(Errno),
}

impl Liveness {
    /// Probes `pid` through `signaller`.
    pub fn probe(signaller: &(impl Signaller + ?Sized), pid: u32) -> Self {
        match signaller.probe(pid) {
            Ok(()) => Self::Alive,
            Err(Errno::ESRCH) => Self::Gone,
            Err(Errno::EPERM) => Self::Forbidden,
            Err(other) => Self::Unknown(other),
        }
    }

    /// Whether the probe counts the process as running.
    ///
    /// A permission failure proves the process exists; any other failure is
    /// treated as not running.
    #[must_use]
    pub const fn counts_as_running(self) -> bool {
        matches!(self, Self::Alive | Self::Forbidden)
    }
}
