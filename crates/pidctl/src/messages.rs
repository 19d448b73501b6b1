//! Human-readable status messages accumulated by a controller.

use std::fmt;
use std::io::{self, Write};

use tracing::{info, warn};

use crate::CONTROL_TARGET;

/// Severity attached to a message when it is mirrored into telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Routine status.
    Info,
    /// Something the operator should look at.
    Warning,
}

/// Append-only message list with optional echo.
///
/// Every entry is also emitted as a tracing event so that controller activity
/// reaches the configured telemetry sink.
pub struct MessageLog {
    entries: Vec<String>,
    echo: Option<Box<dyn Write + Send>>,
}

impl MessageLog {
    /// Builds a log that echoes to standard output when `verbose` is set.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        let echo = verbose.then(|| Box::new(io::stdout()) as Box<dyn Write + Send>);
        Self {
            entries: Vec::new(),
            echo,
        }
    }

    /// Builds a log that echoes every entry to `writer`.
    pub fn with_echo(writer: impl Write + Send + 'static) -> Self {
        Self {
            entries: Vec::new(),
            echo: Some(Box::new(writer)),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, level: MessageLevel, message: impl Into<String>) {
        let entry = message.into();
        match level {
            MessageLevel::Info => info!(target: CONTROL_TARGET, "{entry}"),
            MessageLevel::Warning => warn!(target: CONTROL_TARGET, "{entry}"),
        }
        if let Some(echo) = self.echo.as_mut()
            && let Err(error) = writeln!(echo, "{entry}")
        {
            warn!(target: CONTROL_TARGET, error = %error, "failed to echo message");
        }
        self.entries.push(entry);
    }

    /// Every message in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}

impl fmt::Debug for MessageLog {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MessageLog")
            .field("entries", &self.entries)
            .field("echo", &self.echo.is_some())
            .finish()
    }
}
