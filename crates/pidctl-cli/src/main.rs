//! CLI entrypoint for `pidctl`.
//!
//! The binary delegates to [`pidctl_cli::run`] so the runtime can be driven
//! with substitute streams in tests.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    pidctl_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
