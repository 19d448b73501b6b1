//! Stop signal identifiers and the worker's reaction to them.

use std::fmt;
use std::str::FromStr;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use signal_hook::consts::FORBIDDEN;
use strum::{Display, EnumString};

use crate::ConfigError;

/// Signal sent to the worker to request a graceful stop.
///
/// Accepts the usual spellings: `TERM`, `SIGTERM`, `terminate`, or the raw
/// signal number. Signals that cannot be caught (`KILL`, `STOP`, and the
/// fault signals) are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopSignal(Signal);

impl StopSignal {
    /// The default polite termination request.
    pub const TERMINATE: Self = Self(Signal::SIGTERM);

    /// Wraps an explicit signal.
    #[must_use]
    pub const fn new(signal: Signal) -> Self {
        Self(signal)
    }

    /// Returns the concrete signal.
    #[must_use]
    pub const fn signal(self) -> Signal {
        self.0
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::TERMINATE
    }
}

impl fmt::Display for StopSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl FromStr for StopSignal {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownSignal {
            raw: raw.to_owned(),
        };
        let trimmed = raw.trim();
        let signal = if let Ok(number) = trimmed.parse::<i32>() {
            Signal::try_from(number).map_err(|_| unknown())?
        } else {
            let upper = trimmed.to_ascii_uppercase();
            let canonical = match upper.as_str() {
                "TERMINATE" => String::from("SIGTERM"),
                "INTERRUPT" => String::from("SIGINT"),
                "HANGUP" => String::from("SIGHUP"),
                name if name.starts_with("SIG") => upper.clone(),
                name => format!("SIG{name}"),
            };
            Signal::from_str(&canonical).map_err(|_| unknown())?
        };
        if is_catchable(signal) {
            Ok(Self(signal))
        } else {
            Err(ConfigError::ForbiddenSignal { signal })
        }
    }
}

/// Whether a handler may be installed for `signal`.
#[must_use]
pub fn is_catchable(signal: Signal) -> bool {
    !FORBIDDEN.contains(&(signal as i32))
}

/// What the worker does when it receives the stop signal.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StopSignalAction {
    /// Dispatch the stop callback inside the worker, drop the pid file, and exit.
    Exit,
    /// Record the request for callbacks to observe and keep running. A start
    /// callback that never checks the request is killed once the stop timeout
    /// lapses.
    #[default]
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TERM", Signal::SIGTERM)]
    #[case("SIGTERM", Signal::SIGTERM)]
    #[case("terminate", Signal::SIGTERM)]
    #[case("int", Signal::SIGINT)]
    #[case("hangup", Signal::SIGHUP)]
    #[case("USR1", Signal::SIGUSR1)]
    #[case("15", Signal::SIGTERM)]
    fn parses_signal_spellings(#[case] raw: &str, #[case] expected: Signal) {
        let parsed: StopSignal = raw.parse().expect("signal should parse");
        assert_eq!(parsed.signal(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("SIGNOPE")]
    #[case("4096")]
    fn rejects_unknown_signals(#[case] raw: &str) {
        let error = raw
            .parse::<StopSignal>()
            .expect_err("signal should be rejected");
        assert!(matches!(error, ConfigError::UnknownSignal { .. }));
    }

    #[rstest]
    #[case("KILL", Signal::SIGKILL)]
    #[case("9", Signal::SIGKILL)]
    #[case("SIGSTOP", Signal::SIGSTOP)]
    #[case("segv", Signal::SIGSEGV)]
    fn rejects_signals_that_cannot_be_caught(#[case] raw: &str, #[case] expected: Signal) {
        let error = raw
            .parse::<StopSignal>()
            .expect_err("uncatchable signal should be rejected");
        assert!(
            matches!(error, ConfigError::ForbiddenSignal { signal } if signal == expected),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn default_is_terminate() {
        assert_eq!(StopSignal::default().to_string(), "SIGTERM");
    }
}
