//! Process plumbing: spawning, detaching, and signalling workers.

mod daemonize;
mod environment;
mod errors;
mod launcher;
mod signaller;

pub use daemonize::{Daemonize, StdioRedirect};
pub use environment::{Environment, StopHandler, StopOutcome, SystemEnvironment};
pub use errors::LaunchError;
pub use launcher::{ForkLauncher, Launcher, WorkerTask};
pub use signaller::{Liveness, Signaller, SystemSignaller};

#[cfg(test)]
pub(crate) use signaller::MockSignaller;

pub(crate) use crate::PROCESS_TARGET;
