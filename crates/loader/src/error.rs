//! Error types for the loader crate.

use scriptcache_core::CoreError;

use crate::report::LoadReport;
use crate::transport::TransportError;

/// Why a single script entry failed during a load pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The entry was malformed and never sent to the store.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The batch carrying the entry's command failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The store accepted the batch but refused the script
    /// (e.g. a compile error in the body).
    #[error("Script rejected by store: {0}")]
    Rejected(String),

    /// The store answered with a reply of the wrong shape.
    #[error("Unexpected reply from store: {0}")]
    UnexpectedReply(String),
}

/// Errors raised while constructing or configuring a loader.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Loaders spawn background work and must be built inside a Tokio runtime.
    #[error("Script loader must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("Invalid configuration value for {key}: {value:?}")]
    Config { key: &'static str, value: String },
}

/// Outcome of a load pass that did not fully succeed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// At least one entry failed. `last` is the last failure to settle;
    /// `report` holds every entry's outcome.
    #[error("{failed} script(s) failed to load; last error: {last}")]
    Scripts {
        failed: usize,
        #[source]
        last: ScriptError,
        report: LoadReport,
    },

    /// The pass task itself was cancelled or panicked.
    #[error("Load pass aborted: {0}")]
    Aborted(String),
}

impl LoadError {
    /// The per-entry report, when the pass ran to completion.
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            LoadError::Scripts { report, .. } => Some(report),
            LoadError::Aborted(_) => None,
        }
    }
}
