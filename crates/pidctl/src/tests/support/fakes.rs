//! In-process stand-ins for the launcher, signaller, and environment.
//!
//! Workers run on threads; a shared [`ProcessTable`] tracks which fake pids
//! are alive and routes stop signals to the handler each worker installs.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use nix::errno::Errno;
use nix::sys::signal::Signal;

use crate::process::{Environment, LaunchError, Launcher, Signaller, StopHandler, StopOutcome, WorkerTask};

const FIRST_FAKE_PID: u32 = 40_000;

/// Side effects a worker asked its environment to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EnvEvent {
    ChangeDir(PathBuf),
    ResetUmask,
    RedirectStdio,
    StopHandler(Signal),
}

#[derive(Default)]
struct JournalState {
    events: Vec<EnvEvent>,
    reports: Vec<String>,
    handler: Option<StopHandler>,
}

/// Shared record of what one worker's environment was asked to do.
#[derive(Clone, Default)]
pub(crate) struct EnvJournal(Arc<Mutex<JournalState>>);

impl EnvJournal {
    pub(crate) fn events(&self) -> Vec<EnvEvent> {
        self.0.lock().expect("journal lock").events.clone()
    }

    pub(crate) fn reports(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").reports.clone()
    }

    pub(crate) fn stop_handler(&self) -> Option<StopHandler> {
        self.0.lock().expect("journal lock").handler.clone()
    }

    fn record(&self, event: EnvEvent) {
        self.0.lock().expect("journal lock").events.push(event);
    }
}

/// [`Environment`] that records requests instead of touching the process.
pub(crate) struct RecordingEnvironment {
    pid: u32,
    journal: EnvJournal,
    refuse_chdir: bool,
}

impl RecordingEnvironment {
    pub(crate) fn new(pid: u32, journal: EnvJournal) -> Self {
        Self {
            pid,
            journal,
            refuse_chdir: false,
        }
    }

    pub(crate) fn refusing_chdir(mut self) -> Self {
        self.refuse_chdir = true;
        self
    }
}

impl Environment for RecordingEnvironment {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn change_dir(&mut self, path: &Path) -> io::Result<()> {
        if self.refuse_chdir {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "chdir refused"));
        }
        self.journal.record(EnvEvent::ChangeDir(path.to_path_buf()));
        Ok(())
    }

    fn reset_umask(&mut self) {
        self.journal.record(EnvEvent::ResetUmask);
    }

    fn redirect_stdio(&mut self, _input: &File, _output: &File) -> io::Result<()> {
        self.journal.record(EnvEvent::RedirectStdio);
        Ok(())
    }

    fn on_stop_signal(&mut self, signal: Signal, handler: StopHandler) -> io::Result<()> {
        let mut state = self.journal.0.lock().expect("journal lock");
        state.events.push(EnvEvent::StopHandler(signal));
        state.handler = Some(handler);
        Ok(())
    }

    fn report(&mut self, message: &str) {
        self.journal
            .0
            .lock()
            .expect("journal lock")
            .reports
            .push(message.to_owned());
    }
}

struct FakeProcess {
    alive: bool,
    foreign: bool,
    journal: Option<EnvJournal>,
}

struct TableState {
    processes: HashMap<u32, FakeProcess>,
    sent: Vec<(u32, Signal)>,
    next_pid: u32,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            processes: HashMap::new(),
            sent: Vec::new(),
            next_pid: FIRST_FAKE_PID,
        }
    }
}

/// Fake kernel view shared by the launcher and signaller doubles.
#[derive(Clone, Default)]
pub(crate) struct ProcessTable(Arc<Mutex<TableState>>);

impl ProcessTable {
    fn spawn(&self, journal: EnvJournal) -> u32 {
        let mut state = self.0.lock().expect("table lock");
        let pid = state.next_pid;
        state.next_pid += 1;
        state.processes.insert(
            pid,
            FakeProcess {
                alive: true,
                foreign: false,
                journal: Some(journal),
            },
        );
        pid
    }

    /// Registers a live process owned by another user.
    pub(crate) fn insert_foreign(&self, pid: u32) {
        self.0.lock().expect("table lock").processes.insert(
            pid,
            FakeProcess {
                alive: true,
                foreign: true,
                journal: None,
            },
        );
    }

    pub(crate) fn is_alive(&self, pid: u32) -> bool {
        self.0
            .lock()
            .expect("table lock")
            .processes
            .get(&pid)
            .is_some_and(|process| process.alive)
    }

    pub(crate) fn mark_exited(&self, pid: u32) {
        if let Some(process) = self.0.lock().expect("table lock").processes.get_mut(&pid) {
            process.alive = false;
        }
    }

    /// Every signal delivered so far, in order.
    pub(crate) fn sent(&self) -> Vec<(u32, Signal)> {
        self.0.lock().expect("table lock").sent.clone()
    }

    pub(crate) fn was_sent(&self, pid: u32, signal: Signal) -> bool {
        self.sent().contains(&(pid, signal))
    }

    fn probe(&self, pid: u32) -> Result<(), Errno> {
        let state = self.0.lock().expect("table lock");
        match state.processes.get(&pid) {
            Some(process) if process.alive && process.foreign => Err(Errno::EPERM),
            Some(process) if process.alive => Ok(()),
            _ => Err(Errno::ESRCH),
        }
    }

    fn deliver(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        let handler = {
            let mut state = self.0.lock().expect("table lock");
            state.sent.push((pid, signal));
            let process = state
                .processes
                .get_mut(&pid)
                .filter(|process| process.alive)
                .ok_or(Errno::ESRCH)?;
            if process.foreign {
                return Err(Errno::EPERM);
            }
            let installed = process
                .journal
                .as_ref()
                .and_then(EnvJournal::stop_handler);
            match installed {
                Some(handler) if signal != Signal::SIGKILL => handler,
                _ => {
                    // No handler: the default disposition terminates.
                    process.alive = false;
                    return Ok(());
                }
            }
        };
        if handler() == StopOutcome::Exit {
            self.mark_exited(pid);
        }
        Ok(())
    }
}

/// [`Signaller`] backed by a [`ProcessTable`].
#[derive(Clone)]
pub(crate) struct FakeSignaller(pub(crate) ProcessTable);

impl Signaller for FakeSignaller {
    fn probe(&self, pid: u32) -> Result<(), Errno> {
        self.0.probe(pid)
    }

    fn send(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        self.0.deliver(pid, signal)
    }
}

/// [`Launcher`] that runs worker tasks on threads under fake pids.
#[derive(Clone)]
pub(crate) struct FakeLauncher {
    table: ProcessTable,
    refusal: Option<String>,
    launched: Arc<Mutex<Vec<(u32, EnvJournal)>>>,
    workers: Arc<Mutex<Vec<JoinHandle<i32>>>>,
}

impl FakeLauncher {
    pub(crate) fn new(table: ProcessTable) -> Self {
        Self {
            table,
            refusal: None,
            launched: Arc::default(),
            workers: Arc::default(),
        }
    }

    /// Makes every launch fail with `reason`.
    pub(crate) fn refusing(mut self, reason: &str) -> Self {
        self.refusal = Some(reason.to_owned());
        self
    }

    pub(crate) fn launches(&self) -> usize {
        self.launched.lock().expect("launch lock").len()
    }

    pub(crate) fn journal(&self, pid: u32) -> Option<EnvJournal> {
        self.launched
            .lock()
            .expect("launch lock")
            .iter()
            .find(|(launched, _)| *launched == pid)
            .map(|(_, journal)| journal.clone())
    }

    /// Waits for every worker thread to return.
    pub(crate) fn join_all(&self) {
        let handles: Vec<_> = self.workers.lock().expect("worker lock").drain(..).collect();
        for handle in handles {
            handle.join().expect("worker thread should not panic");
        }
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, task: WorkerTask) -> Result<u32, LaunchError> {
        if let Some(reason) = &self.refusal {
            return Err(LaunchError::Detach {
                reason: reason.clone(),
            });
        }
        let journal = EnvJournal::default();
        let pid = self.table.spawn(journal.clone());
        self.launched
            .lock()
            .expect("launch lock")
            .push((pid, journal.clone()));

        let table = self.table.clone();
        let handle = thread::spawn(move || {
            let mut environment = RecordingEnvironment::new(pid, journal);
            let status = task(&mut environment);
            table.mark_exited(pid);
            status
        });
        self.workers.lock().expect("worker lock").push(handle);
        Ok(pid)
    }
}
