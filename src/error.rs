//! Error types for store access, mutation, dispatch and injection.

use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by a fallible getter derivation.
pub type DerivationError = Arc<dyn Error + Send + Sync + 'static>;

/// Every way a store operation can fail.
///
/// All variants are programmer errors reported synchronously at the call that
/// caused them. None are retried.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("unknown mutation type: {0}")]
    UnknownMutation(String),

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("unknown getter: {0}")]
    UnknownGetter(String),

    #[error("`{name}` expects a payload of type {expected}, got {actual}")]
    PayloadType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("getter `{name}` yields {expected}, not {requested}")]
    GetterType {
        name: String,
        expected: &'static str,
        requested: &'static str,
    },

    #[error("getter `{name}` failed: {source}")]
    GetterDerivation {
        name: String,
        #[source]
        source: DerivationError,
    },

    #[error("mutation `{0}` committed while the state is borrowed")]
    StateBusy(String),

    #[error("no store of type {state} found in the component's ancestor chain")]
    StoreNotFound { state: &'static str },

    #[error("action `{0}` was dropped before it completed")]
    ActionCancelled(String),

    #[error("failed to spawn action `{0}`: executor is shut down")]
    Spawn(String),
}

/// Result type for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
