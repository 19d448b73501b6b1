//! The controller: start, stop, restart, kill, status, and clean.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use pidctl_config::DaemonConfig;
use tracing::{debug, info, warn};

use crate::CONTROL_TARGET;
use crate::callbacks::{CallbackTable, Daemon, ErrorCounter, Fault, Phase, Receiver, StopFlag};
use crate::error::ControlError;
use crate::messages::{MessageLevel, MessageLog};
use crate::pid_file::PidFile;
use crate::process::{
    Daemonize, Environment, ForkLauncher, LaunchError, Launcher, Liveness, Signaller, StdioRedirect,
    SystemSignaller,
};
use crate::worker::WorkerPlan;

/// Default delay between liveness probes while waiting for a stop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How long to wait for a forcibly killed worker to disappear.
const KILL_SETTLE: Duration = Duration::from_secs(1);
const KILL_SETTLE_STEP: Duration = Duration::from_millis(50);

/// Result of a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    /// The recorded worker is alive.
    Running {
        /// Worker pid.
        pid: u32,
    },
    /// No live worker is recorded.
    NotRunning,
}

impl DaemonStatus {
    /// Whether the status reports a live worker.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Process-level collaborators a controller delegates to.
#[derive(Debug, Clone, Default)]
pub struct Collaborators<L, S> {
    /// Spawns workers.
    pub launcher: L,
    /// Probes and signals workers.
    pub signaller: S,
}

/// Supervises one named daemon through its pid file.
///
/// A controller never owns the worker: every operation re-reads the pid file
/// and probes the recorded pid, so separate controller processes built from
/// the same configuration agree on the daemon's state.
pub struct Control<D, L = ForkLauncher, S = SystemSignaller> {
    config: DaemonConfig,
    callbacks: Arc<CallbackTable<D>>,
    daemon: Arc<D>,
    pid_file: PidFile,
    messages: MessageLog,
    errors: ErrorCounter,
    stop: StopFlag,
    pid: Option<u32>,
    collaborators: Collaborators<L, S>,
    poll_interval: Duration,
}

impl<D: Daemon> Control<D> {
    /// Builds a controller that forks real workers.
    pub fn new(config: DaemonConfig, callbacks: Arc<CallbackTable<D>>, daemon: D) -> Self {
        Self::with_collaborators(
            config,
            callbacks,
            daemon,
            Collaborators {
                launcher: ForkLauncher,
                signaller: SystemSignaller,
            },
        )
    }
}

impl<D, L, S> Control<D, L, S>
where
    D: Daemon,
    L: Launcher,
    S: Signaller,
{
    /// Builds a controller with explicit collaborators.
    pub fn with_collaborators(
        config: DaemonConfig,
        callbacks: Arc<CallbackTable<D>>,
        daemon: D,
        collaborators: Collaborators<L, S>,
    ) -> Self {
        let pid_file = PidFile::new(config.pid_path());
        let pid = pid_file.read();
        let messages = MessageLog::new(config.verbose());
        Self {
            config,
            callbacks,
            daemon: Arc::new(daemon),
            pid_file,
            messages,
            errors: ErrorCounter::default(),
            stop: StopFlag::default(),
            pid,
            collaborators,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the delay between liveness probes.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Replaces the message log, for example to capture echoed output.
    #[must_use]
    pub fn with_messages(mut self, messages: MessageLog) -> Self {
        self.messages = messages;
        self
    }

    /// Daemon name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// Validated configuration.
    #[must_use]
    pub const fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// User daemon shared with callbacks.
    #[must_use]
    pub fn daemon(&self) -> &D {
        &self.daemon
    }

    /// Pid recorded in the pid file, falling back to the last launched pid.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid_file.read().or(self.pid)
    }

    /// Pid file path.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_file.path()
    }

    /// Log file path.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.config.log_path()
    }

    /// Messages produced so far.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        self.messages.entries()
    }

    /// `Error` dispatches counted by this controller.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors.get()
    }

    /// Probes the recorded pid.
    #[must_use]
    pub fn liveness(&self) -> Option<Liveness> {
        self.pid()
            .map(|pid| Liveness::probe(&self.collaborators.signaller, pid))
    }

    /// Whether the recorded pid belongs to a live process.
    #[must_use]
    pub fn running(&self) -> bool {
        self.liveness().is_some_and(Liveness::counts_as_running)
    }

    /// Spawns the worker unless one is already running.
    ///
    /// An existing live worker is reported as a message and left alone unless
    /// multiple instances are allowed. Failures while spawning are reported
    /// and dispatched to the `Error` callback.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] when the pid or log directories
    /// cannot be created or no `Start` callback is registered.
    pub fn start(&mut self) -> Result<(), ControlError> {
        if !self.config.allow_multiple()
            && let Some(pid) = self.live_pid()
        {
            let message = format!("\"{}\" is already running (pid {pid})", self.name());
            self.messages.push(MessageLevel::Warning, message);
            return Ok(());
        }
        self.config.ensure_directories()?;
        self.callbacks.validate()?;

        match self.spawn_worker() {
            Ok(pid) => {
                self.pid = Some(pid);
                info!(target: CONTROL_TARGET, daemon = %self.name(), pid, "daemon started");
            }
            Err(error) => {
                let message = format!("\"{}\" failed to start: {error}", self.name());
                self.messages.push(MessageLevel::Warning, message);
                self.dispatch_error(&Fault::with_source("failed to spawn worker", error));
            }
        }
        Ok(())
    }

    /// Stops the worker, escalating to `SIGKILL` after the timeout.
    ///
    /// The pid file is removed as soon as the stop signal has been sent, then
    /// the `Stop` callback runs, the worker is polled until it exits or the
    /// timeout lapses, and finally `AfterStop` runs.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Signal`] when a live worker cannot be
    /// signalled and [`ControlError::PidFile`] when the pid file cannot be
    /// removed.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        let Some(pid) = self.live_pid() else {
            self.pid_file.remove()?;
            self.pid = None;
            let message = format!("\"{}\" pid file not found", self.name());
            self.messages.push(MessageLevel::Info, message);
            return Ok(());
        };

        let signal = self.config.stop_signal().signal();
        info!(target: CONTROL_TARGET, daemon = %self.name(), pid, signal = %signal, "stopping daemon");
        self.send(pid, signal)?;
        self.pid_file.remove()?;
        self.dispatch(Phase::Stop);

        if !self.await_exit(pid, self.config.timeout(), self.poll_interval) {
            warn!(
                target: CONTROL_TARGET,
                daemon = %self.name(),
                pid,
                timeout_secs = self.config.timeout().as_secs(),
                "daemon outlived its stop timeout; sending SIGKILL"
            );
            self.send(pid, Signal::SIGKILL)?;
            self.await_exit(pid, KILL_SETTLE, KILL_SETTLE_STEP);
        }
        self.forget_if_gone(pid);
        self.dispatch(Phase::AfterStop);
        Ok(())
    }

    /// Stops the daemon, waits for it to disappear, and starts it again.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::stop`] and [`Self::start`].
    pub fn restart(&mut self) -> Result<(), ControlError> {
        self.stop()?;
        while self.running() {
            thread::sleep(self.poll_interval);
        }
        self.start()
    }

    /// Sends `SIGKILL` to a live worker without a graceful phase.
    ///
    /// Whether `Error` and `AfterStop` are dispatched afterwards is decided by
    /// configuration; by default neither is.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Signal`] when the worker cannot be signalled
    /// and [`ControlError::PidFile`] when the pid file cannot be removed.
    pub fn kill(&mut self, remove_pid_file: bool) -> Result<(), ControlError> {
        if let Some(pid) = self.live_pid() {
            let message = format!("killing \"{}\" (pid {pid})", self.name());
            self.messages.push(MessageLevel::Warning, message);
            self.send(pid, Signal::SIGKILL)?;
            self.await_exit(pid, KILL_SETTLE, KILL_SETTLE_STEP);
            self.forget_if_gone(pid);
            if self.config.kill_dispatches_error() {
                let fault = Fault::new(format!("\"{}\" (pid {pid}) was killed", self.name()));
                self.dispatch_error(&fault);
            }
            if self.config.kill_dispatches_after_stop() {
                self.dispatch(Phase::AfterStop);
            }
        }
        if remove_pid_file {
            self.pid_file.remove()?;
        }
        Ok(())
    }

    /// Reports whether the daemon is running and records a message saying so.
    pub fn status(&mut self) -> DaemonStatus {
        if let Some(pid) = self.live_pid() {
            let message = format!("\"{}\" is running (pid {pid})", self.name());
            self.messages.push(MessageLevel::Info, message);
            DaemonStatus::Running { pid }
        } else {
            let message = format!("\"{}\" is not running", self.name());
            self.messages.push(MessageLevel::Info, message);
            DaemonStatus::NotRunning
        }
    }

    /// Deletes the log and pid files; missing files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::RemoveLog`] or [`ControlError::PidFile`] when
    /// an existing file cannot be removed.
    pub fn clean(&mut self) -> Result<(), ControlError> {
        let log_path = self.config.log_path();
        match fs::remove_file(log_path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ControlError::RemoveLog {
                    path: log_path.to_path_buf(),
                    source,
                });
            }
        }
        self.pid_file.remove()?;
        debug!(target: CONTROL_TARGET, daemon = %self.name(), "log and pid files removed");
        Ok(())
    }

    fn live_pid(&self) -> Option<u32> {
        self.pid().filter(|pid| self.is_alive(*pid))
    }

    fn is_alive(&self, pid: u32) -> bool {
        Liveness::probe(&self.collaborators.signaller, pid).counts_as_running()
    }

    fn forget_if_gone(&mut self, pid: u32) {
        if !self.is_alive(pid) {
            self.pid = None;
        }
    }

    /// Delivers `signal`; a process that vanished in the meantime is not an
    /// error.
    fn send(&self, pid: u32, signal: Signal) -> Result<(), ControlError> {
        match self.collaborators.signaller.send(pid, signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!(target: CONTROL_TARGET, pid, signal = %signal, "process already gone");
                Ok(())
            }
            Err(source) => Err(ControlError::Signal {
                pid,
                signal,
                source,
            }),
        }
    }

    /// Polls until `pid` is gone or `window` lapses; returns whether it left.
    fn await_exit(&self, pid: u32, window: Duration, step: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if !self.is_alive(pid) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(step.min(remaining));
        }
    }

    fn spawn_worker(&self) -> Result<u32, LaunchError> {
        let mut daemonize = Daemonize::new(self.config.work_dir());
        if self.config.logging_enabled() {
            daemonize = daemonize.with_stdio(StdioRedirect::open(
                self.config.log_path(),
                self.config.sync_log(),
            )?);
        }
        let plan = WorkerPlan {
            daemon: Arc::clone(&self.daemon),
            callbacks: Arc::clone(&self.callbacks),
            name: self.config.name().to_owned(),
            pid_file: self.pid_file.clone(),
            daemonize,
            stop_signal: self.config.stop_signal(),
            stop_action: self.config.stop_signal_action(),
            errors: ErrorCounter::starting_at(self.errors.get()),
        };
        self.collaborators
            .launcher
            .launch(Box::new(move |environment: &mut dyn Environment| {
                plan.run(environment)
            }))
    }

    fn receiver(&self) -> Receiver<'_, D> {
        Receiver {
            daemon: self.daemon.as_ref(),
            name: self.config.name(),
            pid: self.pid(),
            errors: &self.errors,
            stop: &self.stop,
        }
    }

    /// Dispatches `phase` in the controller, routing faults to `Error`.
    fn dispatch(&mut self, phase: Phase) {
        let outcome = self.callbacks.dispatch(phase, &self.receiver());
        if let Err(fault) = outcome {
            let message = format!("\"{}\" {phase} callback failed: {}", self.name(), fault.describe());
            self.messages.push(MessageLevel::Warning, message);
            self.dispatch_error(&fault);
        }
    }

    fn dispatch_error(&mut self, fault: &Fault) {
        warn!(
            target: CONTROL_TARGET,
            daemon = %self.name(),
            error = %fault.describe(),
            "dispatching error callback"
        );
        let outcome = self.callbacks.dispatch(Phase::Error, &self.receiver());
        if let Err(secondary) = outcome {
            let message = format!(
                "\"{}\" error callback failed: {}",
                self.name(),
                secondary.describe()
            );
            self.messages.push(MessageLevel::Warning, message);
        }
    }
}

impl<D, L, S> std::fmt::Debug for Control<D, L, S> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Control")
            .field("name", &self.config.name())
            .field("pid_path", &self.pid_file.path())
            .field("pid", &self.pid)
            .field("callbacks", &self.callbacks)
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}
