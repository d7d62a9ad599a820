//! Shared fixtures for the loader integration tests.

#![allow(dead_code)]

use std::time::Duration;

use scriptcache_loader::{LoaderState, ScriptRegistry, StateChange};
use tokio::sync::broadcast;

pub const HELLO: &str = "return 'hello'";
pub const HELLO_SHA: &str = "1b936e3fe509bcbc9cd0664897bbe8fd0cac101b";

pub const BYE: &str = "return 'bye'";
pub const BYE_SHA: &str = "529e915cc3c034336e2d659818a4436b5e51cc2d";

/// How long a test waits for a state change before giving up.
const CHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Route loader logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// The two-script registry used throughout: `a` and `b`.
pub fn hello_bye() -> ScriptRegistry {
    ScriptRegistry::with_scripts([("a", HELLO), ("b", BYE)])
}

/// Receive the next state change as a `(previous, next)` pair.
///
/// Panics if nothing arrives within a few seconds.
pub async fn next_change(rx: &mut broadcast::Receiver<StateChange>) -> (LoaderState, LoaderState) {
    tokio::time::timeout(CHANGE_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a state change")
        .expect("state bus closed")
        .pair()
}

/// Wait until the loader publishes a transition into `target`.
pub async fn wait_for(rx: &mut broadcast::Receiver<StateChange>, target: LoaderState) {
    tokio::time::timeout(CHANGE_TIMEOUT, scriptcache_events::wait_for_state(rx, target))
        .await
        .expect("timed out waiting for the target state")
        .expect("state bus closed");
}
