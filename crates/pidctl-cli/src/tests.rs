//! Unit tests for argument handling and the CLI runtime.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use pidctl_config::LogFormat;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::cli::{Action, Cli};
use super::run;

#[fixture]
fn workdir() -> TempDir {
    TempDir::new().expect("temporary directory")
}

fn args(values: &[&str]) -> Vec<OsString> {
    std::iter::once("pidctl")
        .chain(values.iter().copied())
        .map(OsString::from)
        .collect()
}

fn invoke(values: &[&str]) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run(args(values), &mut stdout, &mut stderr);
    (
        code,
        String::from_utf8(stdout).expect("utf-8 stdout"),
        String::from_utf8(stderr).expect("utf-8 stderr"),
    )
}

fn path_arg(dir: &Path) -> &str {
    dir.to_str().expect("utf-8 temporary path")
}

#[rstest]
fn flags_override_configuration_file(workdir: TempDir) {
    let file = workdir.path().join("pidctl.toml");
    fs::write(
        &file,
        "name = \"filed\"\ntimeout_seconds = 30\nlog_format = \"compact\"\n",
    )
    .expect("config file");
    let cli = Cli::try_parse_from(args(&[
        "--config-path",
        file.to_str().expect("utf-8 path"),
        "--timeout",
        "4",
        "--log-format",
        "json",
        "status",
    ]))
    .expect("arguments parse");

    let options = cli.options().expect("options load");

    assert_eq!(options.name.as_deref(), Some("filed"));
    assert_eq!(options.timeout_seconds, 4);
    assert_eq!(options.log_format, LogFormat::Json);
    assert_eq!(cli.action, Action::Status);
}

#[rstest]
fn cli_defaults_quieten_telemetry() {
    let cli = Cli::try_parse_from(args(&["--name", "ticker", "status"])).expect("arguments parse");
    let options = cli.options().expect("options load");
    assert_eq!(options.log_filter, "warn");
}

#[rstest]
fn shared_flags_may_follow_the_action(workdir: TempDir) {
    let cli = Cli::try_parse_from(args(&[
        "status",
        "--name",
        "ticker",
        "--path",
        path_arg(workdir.path()),
    ]))
    .expect("arguments parse");

    let options = cli.options().expect("options load");

    assert_eq!(cli.action, Action::Status);
    assert_eq!(options.name.as_deref(), Some("ticker"));
    assert_eq!(options.path, workdir.path());
}

#[rstest]
fn kill_accepts_keep_pid_file() {
    let cli = Cli::try_parse_from(args(&["kill", "--keep-pid-file"])).expect("arguments parse");
    assert_eq!(
        cli.action,
        Action::Kill {
            keep_pid_file: true
        }
    );
}

#[rstest]
fn help_goes_to_stdout() {
    let (code, stdout, stderr) = invoke(&["--help"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(stdout.contains("Usage"), "help text missing: {stdout}");
    assert!(stderr.is_empty());
}

#[rstest]
fn unknown_actions_are_usage_errors() {
    let (code, _, stderr) = invoke(&["--name", "ticker", "explode"]);
    assert_eq!(code, ExitCode::from(2));
    assert!(stderr.contains("explode"), "unexpected stderr: {stderr}");
}

#[rstest]
fn status_of_an_unstarted_daemon(workdir: TempDir) {
    let (code, stdout, _) = invoke(&["--name", "ticker", "--path", path_arg(workdir.path()), "status"]);
    assert_eq!(code, ExitCode::from(3));
    assert_eq!(stdout, "\"ticker\" is not running\n");
}

#[rstest]
fn quiet_suppresses_messages(workdir: TempDir) {
    let (code, stdout, _) = invoke(&[
        "--quiet",
        "--name",
        "ticker",
        "--path",
        path_arg(workdir.path()),
        "stop",
    ]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(stdout.is_empty());
}

#[rstest]
fn clean_reports_success(workdir: TempDir) {
    let (code, stdout, _) = invoke(&["--name", "ticker", "--path", path_arg(workdir.path()), "clean"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(stdout, "\"ticker\" cleaned\n");
}

#[rstest]
fn configuration_errors_are_reported(workdir: TempDir) {
    let missing = workdir.path().join("absent");
    let (code, _, stderr) = invoke(&["--name", "ticker", "--path", path_arg(&missing), "status"]);
    assert_eq!(code, ExitCode::FAILURE);
    assert!(stderr.contains("does not exist"), "unexpected stderr: {stderr}");
}

#[rstest]
fn unknown_signals_are_reported(workdir: TempDir) {
    let (code, _, stderr) = invoke(&[
        "--name",
        "ticker",
        "--path",
        path_arg(workdir.path()),
        "--signal",
        "SIGNOPE",
        "status",
    ]);
    assert_eq!(code, ExitCode::FAILURE);
    assert!(stderr.contains("unknown stop signal"), "unexpected stderr: {stderr}");
}
