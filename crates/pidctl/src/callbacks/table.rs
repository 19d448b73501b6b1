use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pidctl_config::ConfigError;
use tracing::debug;

use super::context::{Context, Receiver};
use super::{CallbackError, Fault, Phase};
use crate::CALLBACK_TARGET;

/// Result returned by every callback.
pub type HookResult = Result<(), Fault>;

/// A named daemon method, resolved through [`Daemon::method`].
pub type Method<D> = fn(&Context<'_, D>) -> HookResult;

/// An inline callback closure.
pub type InlineHook<D> = Arc<dyn Fn(&Context<'_, D>) -> HookResult + Send + Sync>;

/// User-defined daemon whose methods back named callbacks.
pub trait Daemon: Send + Sync + 'static {
    /// Looks up the method registered under `name`.
    ///
    /// The default implementation exposes no methods, which suits daemons
    /// that only register inline callbacks.
    fn method(name: &str) -> Option<Method<Self>>
    where
        Self: Sized,
    {
        let _ = name;
        None
    }
}

/// A callback as supplied at registration time.
pub enum Callback<D> {
    /// Refers to a daemon method by name.
    Named(String),
    /// Carries the closure to run.
    Inline(InlineHook<D>),
}

impl<D> Callback<D> {
    /// Refers to the daemon method called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wraps a closure.
    pub fn inline<F>(hook: F) -> Self
    where
        F: Fn(&Context<'_, D>) -> HookResult + Send + Sync + 'static,
    {
        Self::Inline(Arc::new(hook))
    }
}

impl<D> fmt::Debug for Callback<D> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => formatter.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => formatter.write_str("Inline(..)"),
        }
    }
}

enum Registered<D> {
    Method { name: String, method: Method<D> },
    Closure(InlineHook<D>),
}

impl<D> Registered<D> {
    fn invoke(&self, context: &Context<'_, D>) -> HookResult {
        match self {
            Self::Method { method, .. } => method(context),
            Self::Closure(hook) => hook(context),
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Method { name, .. } => name,
            Self::Closure(_) => "<inline>",
        }
    }
}

/// Mapping from lifecycle phase to its single callback.
///
/// Named callbacks are resolved when they are registered, so an unknown
/// method name is reported before the daemon is ever started. Tables are
/// usually wrapped in an [`Arc`] and shared between controllers.
pub struct CallbackTable<D> {
    entries: BTreeMap<Phase, Registered<D>>,
}

impl<D: Daemon> CallbackTable<D> {
    /// Builds an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Starts a fluent builder.
    #[must_use]
    pub fn builder() -> CallbackTableBuilder<D> {
        CallbackTableBuilder {
            pending: Vec::new(),
        }
    }

    /// Registers `callback` for `phase`, replacing any earlier registration.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::UndefinedMethod`] when a named callback does
    /// not resolve to a daemon method. The table is left unchanged.
    pub fn register(&mut self, phase: Phase, callback: Callback<D>) -> Result<(), CallbackError> {
        let registered = match callback {
            Callback::Named(name) => {
                let method =
                    D::method(&name).ok_or_else(|| CallbackError::UndefinedMethod {
                        phase,
                        name: name.clone(),
                    })?;
                Registered::Method { name, method }
            }
            Callback::Inline(hook) => Registered::Closure(hook),
        };
        self.entries.insert(phase, registered);
        Ok(())
    }

    /// Reports whether `phase` has a callback.
    #[must_use]
    pub fn is_registered(&self, phase: Phase) -> bool {
        self.entries.contains_key(&phase)
    }

    /// Checks that the table can drive a daemon.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingStartCallback`] when no `Start` callback
    /// has been registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_registered(Phase::Start) {
            Ok(())
        } else {
            Err(ConfigError::MissingStartCallback)
        }
    }

    /// Invokes the callback registered for `phase`, if any.
    ///
    /// Dispatching [`Phase::Error`] increments the error counter first, even
    /// when no callback is registered for it.
    ///
    /// # Errors
    ///
    /// Propagates the callback's fault.
    pub fn dispatch(&self, phase: Phase, receiver: &Receiver<'_, D>) -> HookResult {
        if phase == Phase::Error {
            receiver.errors.increment();
        }
        let Some(entry) = self.entries.get(&phase) else {
            return Ok(());
        };
        debug!(
            target: CALLBACK_TARGET,
            phase = %phase,
            callback = entry.label(),
            daemon = receiver.name,
            "dispatching callback"
        );
        entry.invoke(&Context::new(receiver, phase))
    }
}

impl<D: Daemon> Default for CallbackTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for CallbackTable<D> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(phase, entry)| (phase.as_str(), entry.label())),
            )
            .finish()
    }
}

/// Collects registrations and resolves them in one step.
pub struct CallbackTableBuilder<D> {
    pending: Vec<(Phase, Callback<D>)>,
}

impl<D: Daemon> CallbackTableBuilder<D> {
    /// Queues a registration for an arbitrary phase.
    #[must_use]
    pub fn on(mut self, phase: Phase, callback: Callback<D>) -> Self {
        self.pending.push((phase, callback));
        self
    }

    /// Queues the `BeforeStart` callback.
    #[must_use]
    pub fn before_start(self, callback: Callback<D>) -> Self {
        self.on(Phase::BeforeStart, callback)
    }

    /// Queues the `Start` callback.
    #[must_use]
    pub fn start(self, callback: Callback<D>) -> Self {
        self.on(Phase::Start, callback)
    }

    /// Queues the `Stop` callback.
    #[must_use]
    pub fn stop(self, callback: Callback<D>) -> Self {
        self.on(Phase::Stop, callback)
    }

    /// Queues the `AfterStop` callback.
    #[must_use]
    pub fn after_stop(self, callback: Callback<D>) -> Self {
        self.on(Phase::AfterStop, callback)
    }

    /// Queues the `Error` callback.
    #[must_use]
    pub fn error(self, callback: Callback<D>) -> Self {
        self.on(Phase::Error, callback)
    }

    /// Resolves every queued registration in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CallbackError`] raised while resolving names.
    pub fn build(self) -> Result<CallbackTable<D>, CallbackError> {
        let mut table = CallbackTable::new();
        for (phase, callback) in self.pending {
            table.register(phase, callback)?;
        }
        Ok(table)
    }
}

impl<D> fmt::Debug for CallbackTableBuilder<D> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CallbackTableBuilder")
            .field("pending", &self.pending.len())
            .finish()
    }
}
