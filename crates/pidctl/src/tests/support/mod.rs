//! Doubles standing in for forking and signalling in controller tests.

mod daemon;
mod fakes;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use pidctl_config::{DaemonConfig, DaemonOptions};

pub(crate) use daemon::{StartMode, TestDaemon, test_callbacks};
pub(crate) use fakes::{EnvEvent, EnvJournal, FakeLauncher, FakeSignaller, ProcessTable, RecordingEnvironment};

const WAIT_TIMEOUT: Duration = Duration::from_secs(3);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Polls `condition` until it holds or the wait budget runs out.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(WAIT_STEP);
    }
    condition()
}

/// Validated configuration for a daemon called `name` working under `dir`.
pub(crate) fn test_config(
    dir: &Path,
    name: &str,
    adjust: impl FnOnce(&mut DaemonOptions),
) -> DaemonConfig {
    let mut options = DaemonOptions::named(name);
    options.path = dir.to_path_buf();
    options.timeout_seconds = 1;
    adjust(&mut options);
    DaemonConfig::from_options(options).expect("test configuration is valid")
}
