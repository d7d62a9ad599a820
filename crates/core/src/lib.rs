//! Domain types shared by the script cache crates.
//!
//! Everything in here is pure: no I/O, no runtime. The loader crate
//! drives these types against a transport; the events crate carries
//! [`LoaderState`] transitions to subscribers.

pub mod error;
pub mod hashing;
pub mod script;
pub mod state;

pub use error::CoreError;
pub use script::ScriptEntry;
pub use state::LoaderState;
