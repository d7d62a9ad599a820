//! State-change notification infrastructure for script loaders.
//!
//! - [`StateBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, with a loader as its single publisher.
//! - [`StateChange`] — the `(previous, next)` event envelope.
//! - [`StateLogger`] — background observer that logs every change.
//! - [`wait_for_state`] — await a target state on a receiver.

pub mod bus;
pub mod observer;

pub use bus::{wait_for_state, StateBus, StateChange};
pub use observer::StateLogger;
