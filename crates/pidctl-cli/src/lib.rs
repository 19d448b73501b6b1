//! Command-line runtime for `pidctl`.
//!
//! Parses arguments, builds the daemon configuration, and drives a
//! [`Control`] for the bundled ticker daemon. Output streams are injected so
//! the runtime can be exercised from tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pidctl::telemetry::{self, TelemetryError};
use pidctl::{CallbackError, Control, ControlError, DaemonStatus, MessageLog};
use pidctl_config::{ConfigError, DaemonConfig};
use thiserror::Error;

mod cli;
mod ticker;

use cli::{Action, Cli};
use ticker::Ticker;

/// Exit status reported by `status` when the daemon is not running.
const EXIT_NOT_RUNNING: u8 = 3;

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Runs the CLI with the provided arguments and output streams.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let result = Cli::try_parse_from(args)
        .map_err(AppError::CliUsage)
        .and_then(|cli| execute(&cli, stdout));
    match result {
        Ok(code) => code,
        Err(AppError::CliUsage(error)) => {
            let rendered = error.render();
            let written = if error.use_stderr() {
                write!(stderr, "{rendered}")
            } else {
                write!(stdout, "{rendered}")
            };
            if written.is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2))
        }
        Err(error) => {
            if writeln!(stderr, "pidctl: {error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<ExitCode, AppError> {
    let config = DaemonConfig::from_options(cli.options()?)?;
    telemetry::initialise(&config)?;
    let name = config.name().to_owned();
    let ticker = Ticker::new(Duration::from_secs(cli.interval));
    let mut control =
        Control::new(config, ticker::callbacks()?, ticker).with_messages(MessageLog::new(false));

    let mut summary = None;
    let mut code = ExitCode::SUCCESS;
    match cli.action {
        Action::Start => {
            control.start()?;
            summary = started(&control, &name);
        }
        Action::Stop => {
            control.stop()?;
            summary = Some(format!("\"{name}\" stopped"));
        }
        Action::Restart => {
            control.restart()?;
            summary = started(&control, &name);
        }
        Action::Status => {
            if control.status() == DaemonStatus::NotRunning {
                code = ExitCode::from(EXIT_NOT_RUNNING);
            }
        }
        Action::Kill { keep_pid_file } => control.kill(!keep_pid_file)?,
        Action::Clean => {
            control.clean()?;
            summary = Some(format!("\"{name}\" cleaned"));
        }
    }

    if !cli.quiet {
        let messages = control.messages();
        for message in messages {
            writeln!(stdout, "{message}")?;
        }
        if messages.is_empty()
            && let Some(line) = summary
        {
            writeln!(stdout, "{line}")?;
        }
    }
    Ok(code)
}

fn started(control: &Control<Ticker>, name: &str) -> Option<String> {
    control
        .pid()
        .map(|pid| format!("\"{name}\" started (pid {pid})"))
}

#[cfg(test)]
mod tests;
