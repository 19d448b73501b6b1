use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

/// Failure raised by a lifecycle callback or by the worker around it.
///
/// Faults are routed to the `Error` phase instead of unwinding through the
/// supervisor. Panics inside callbacks are captured and converted with
/// [`Fault::from_panic`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Fault {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Fault {
    /// Builds a fault carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a fault that wraps an underlying error.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Converts a captured panic payload into a fault.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("non-string panic payload"));
        Self::new(format!("callback panicked: {detail}"))
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the message followed by each nested cause.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut rendered = self.message.clone();
        let mut cause = self.source();
        while let Some(error) = cause {
            rendered.push_str(": ");
            rendered.push_str(&error.to_string());
            cause = error.source();
        }
        rendered
    }
}
