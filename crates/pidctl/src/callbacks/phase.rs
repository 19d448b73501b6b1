use std::fmt;

/// Lifecycle phases a callback can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Runs in the worker after the pid file is written, before `Start`.
    BeforeStart,
    /// The daemon body; expected to run until the process is stopped.
    Start,
    /// Runs when a stop is requested.
    Stop,
    /// Runs once the stop sequence has finished, graceful or forced.
    AfterStop,
    /// Runs after a fault; each dispatch bumps the error counter.
    Error,
}

impl Phase {
    /// Every phase in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::BeforeStart,
        Self::Start,
        Self::Stop,
        Self::AfterStop,
        Self::Error,
    ];

    /// Stable snake_case label used in logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeStart => "before_start",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::AfterStop => "after_stop",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
