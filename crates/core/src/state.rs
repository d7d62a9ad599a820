//! Readiness state of a script loader.

use std::fmt;

use serde::Serialize;

/// Where a loader stands with respect to its transport and its scripts.
///
/// Ordered from least to most ready; `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoaderState {
    /// Transport is down; no script guarantees hold.
    Closed,
    /// Transport is up but scripts are not confirmed present.
    Connected,
    /// A load pass is in flight.
    Loading,
    /// The most recent load pass finished without a single failure.
    Ready,
}

impl LoaderState {
    /// Upper-case name, as used in logs and serialized events.
    pub fn as_str(self) -> &'static str {
        match self {
            LoaderState::Closed => "CLOSED",
            LoaderState::Connected => "CONNECTED",
            LoaderState::Loading => "LOADING",
            LoaderState::Ready => "READY",
        }
    }

    /// Initial state for a transport that is (or is not) connected.
    pub fn initial(connected: bool) -> Self {
        if connected {
            LoaderState::Connected
        } else {
            LoaderState::Closed
        }
    }
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
