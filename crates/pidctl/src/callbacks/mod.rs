//! Lifecycle callbacks and the table that dispatches them.
//!
//! A daemon registers at most one callback per [`Phase`]. Callbacks are
//! either named methods on the user's [`Daemon`] type or inline closures;
//! both receive a [`Context`] describing the daemon and the dispatch.

mod context;
mod fault;
mod phase;
mod table;

use thiserror::Error;

pub use context::{Context, ErrorCounter, Receiver, StopFlag};
pub use fault::Fault;
pub use phase::Phase;
pub use table::{
    Callback, CallbackTable, CallbackTableBuilder, Daemon, HookResult, InlineHook, Method,
};

/// Errors raised while registering callbacks.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// A named callback does not match any daemon method.
    #[error("undefined method '{name}' registered for the {phase} callback")]
    UndefinedMethod {
        /// Phase the callback was registered for.
        phase: Phase,
        /// Method name that failed to resolve.
        name: String,
    },
}
