//! Body of the detached worker process.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use pidctl_config::{StopSignal, StopSignalAction};
use tracing::{error, info, warn};

use crate::WORKER_TARGET;
use crate::callbacks::{CallbackTable, Daemon, ErrorCounter, Fault, Phase, Receiver, StopFlag};
use crate::pid_file::PidFile;
use crate::process::{Daemonize, Environment, StopHandler, StopOutcome};

/// Exit status used when the start sequence ends normally.
pub(crate) const EXIT_SUCCESS: i32 = 0;
/// Exit status used when the start sequence faults.
pub(crate) const EXIT_FAULT: i32 = 1;

/// Everything the worker needs, captured in the controller before spawning.
pub(crate) struct WorkerPlan<D> {
    pub(crate) daemon: Arc<D>,
    pub(crate) callbacks: Arc<CallbackTable<D>>,
    pub(crate) name: String,
    pub(crate) pid_file: PidFile,
    pub(crate) daemonize: Daemonize,
    pub(crate) stop_signal: StopSignal,
    pub(crate) stop_action: StopSignalAction,
    pub(crate) errors: ErrorCounter,
}

impl<D: Daemon> WorkerPlan<D> {
    /// Runs the start sequence and returns the worker's exit status.
    ///
    /// Faults and panics from any step are reported on the worker's error
    /// stream and dispatched to the `Error` callback; a failing `Error`
    /// callback is reported and otherwise ignored.
    pub(crate) fn run(self, environment: &mut dyn Environment) -> i32 {
        let pid = environment.pid();
        let stop = StopFlag::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.start_sequence(environment, pid, &stop)
        }))
        .unwrap_or_else(|payload| Err(Fault::from_panic(payload.as_ref())));

        match outcome {
            Ok(()) => {
                info!(target: WORKER_TARGET, daemon = %self.name, pid, "start callback returned");
                EXIT_SUCCESS
            }
            Err(fault) => {
                self.handle_fault(environment, pid, &stop, &fault);
                EXIT_FAULT
            }
        }
    }

    fn start_sequence(
        &self,
        environment: &mut dyn Environment,
        pid: u32,
        stop: &StopFlag,
    ) -> Result<(), Fault> {
        self.pid_file
            .write(pid)
            .map_err(|error| Fault::with_source("failed to record worker pid", error))?;
        self.daemonize
            .apply(environment)
            .map_err(|error| Fault::with_source("failed to detach worker", error))?;
        environment
            .on_stop_signal(self.stop_signal.signal(), self.stop_handler(pid, stop))
            .map_err(|error| Fault::with_source("failed to install stop handler", error))?;

        let receiver = self.receiver(pid, stop);
        self.callbacks.dispatch(Phase::BeforeStart, &receiver)?;
        self.callbacks.dispatch(Phase::Start, &receiver)
    }

    fn handle_fault(
        &self,
        environment: &mut dyn Environment,
        pid: u32,
        stop: &StopFlag,
        fault: &Fault,
    ) {
        let description = fault.describe();
        error!(target: WORKER_TARGET, daemon = %self.name, pid, error = %description, "worker fault");
        environment.report(&format!("\"{}\" fault: {description}", self.name));

        let receiver = self.receiver(pid, stop);
        let dispatched = panic::catch_unwind(AssertUnwindSafe(|| {
            self.callbacks.dispatch(Phase::Error, &receiver)
        }))
        .unwrap_or_else(|payload| Err(Fault::from_panic(payload.as_ref())));
        if let Err(secondary) = dispatched {
            environment.report(&format!(
                "\"{}\" error callback failed: {}",
                self.name,
                secondary.describe()
            ));
        }
    }

    fn receiver<'a>(&'a self, pid: u32, stop: &'a StopFlag) -> Receiver<'a, D> {
        Receiver {
            daemon: self.daemon.as_ref(),
            name: &self.name,
            pid: Some(pid),
            errors: &self.errors,
            stop,
        }
    }

    fn stop_handler(&self, pid: u32, stop: &StopFlag) -> StopHandler {
        let daemon = Arc::clone(&self.daemon);
        let callbacks = Arc::clone(&self.callbacks);
        let name = self.name.clone();
        let pid_file = self.pid_file.clone();
        let errors = self.errors.clone();
        let flag = stop.clone();
        let action = self.stop_action;

        Arc::new(move || {
            flag.request();
            if action == StopSignalAction::Ignore {
                info!(target: WORKER_TARGET, daemon = %name, pid, "stop requested; continuing");
                return StopOutcome::Continue;
            }
            if let Err(error) = pid_file.remove() {
                warn!(target: WORKER_TARGET, daemon = %name, error = %error, "failed to remove pid file");
            }
            let receiver = Receiver {
                daemon: daemon.as_ref(),
                name: &name,
                pid: Some(pid),
                errors: &errors,
                stop: &flag,
            };
            if let Err(fault) = callbacks.dispatch(Phase::Stop, &receiver) {
                warn!(
                    target: WORKER_TARGET,
                    daemon = %name,
                    error = %fault.describe(),
                    "stop callback failed"
                );
                if let Err(secondary) = callbacks.dispatch(Phase::Error, &receiver) {
                    warn!(
                        target: WORKER_TARGET,
                        daemon = %name,
                        error = %secondary.describe(),
                        "error callback failed"
                    );
                }
            }
            info!(target: WORKER_TARGET, daemon = %name, pid, "worker exiting on stop signal");
            StopOutcome::Exit
        })
    }
}
