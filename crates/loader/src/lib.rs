//! Keeps server-side scripts cached on a store that loads scripts by
//! hash (`SCRIPT LOAD` / `SCRIPT EXISTS`).
//!
//! - [`ScriptLoader`] — readiness state machine and the ensure-loaded
//!   pass; follows the transport's connect/disconnect signals and
//!   reloads automatically after a reconnect.
//! - [`ScriptRegistry`] — shared name → script table whose hashes the
//!   loader keeps current.
//! - [`ScriptTransport`] — the connection seam the loader runs over.
//! - [`MemoryStore`] — in-process transport for development and tests.

pub mod command;
pub mod config;
pub mod error;
pub mod loader;
pub mod memory;
pub mod primitives;
pub mod registry;
pub mod report;
pub mod transport;

pub use command::{Command, Reply};
pub use config::LoaderConfig;
pub use error::{LoadError, LoaderError, ScriptError};
pub use loader::{LoadHandle, LoadOptions, ScriptLoader, ScriptLoaderBuilder};
pub use memory::{CommandStats, MemoryStore};
pub use registry::ScriptRegistry;
pub use report::{EntryOutcome, LoadReport};
pub use transport::{ScriptTransport, TransportError, TransportEvent};

pub use scriptcache_core::{LoaderState, ScriptEntry};
pub use scriptcache_events::StateChange;
