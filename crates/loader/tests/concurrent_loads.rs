//! Integration tests for overlapping load passes.
//!
//! Passes are not serialized: each runs to completion on its own and
//! applies its own final transition, so whichever settles last decides
//! the state.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{hello_bye, next_change, HELLO};
use scriptcache_loader::{
    Command, LoadError, LoadOptions, LoaderConfig, MemoryStore, Reply, ScriptError, ScriptLoader,
    ScriptRegistry, ScriptTransport, TransportError, TransportEvent,
};
use tokio::sync::{broadcast, Semaphore};

use scriptcache_loader::LoaderState::{Closed, Connected, Loading, Ready};

/// Holds every batch at a gate until the test opens it.
struct Gated {
    store: MemoryStore,
    gate: Semaphore,
    waiting: AtomicUsize,
}

impl Gated {
    fn new() -> Self {
        Self::over(MemoryStore::new())
    }

    fn over(store: MemoryStore) -> Self {
        Self {
            store,
            gate: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
        }
    }

    fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.gate.close();
    }
}

#[async_trait]
impl ScriptTransport for Gated {
    fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.store.subscribe()
    }

    async fn exec(&self, commands: Vec<Command>) -> Result<Vec<Reply>, TransportError> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        // Closing the semaphore releases every waiter at once.
        let _ = self.gate.acquire().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        self.store.exec(commands).await
    }
}

// ---------------------------------------------------------------------------
// Test: two overlapping successful loads publish a single LOADING -> READY
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_loads_both_resolve() {
    common::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let loader = ScriptLoader::create(store.clone(), hello_bye()).unwrap();
    let mut rx = loader.subscribe();

    let first = loader.load(LoadOptions::default());
    let second = loader.load(LoadOptions::forced());
    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap().is_success());
    assert!(second.unwrap().is_success());
    assert_eq!(loader.state(), Ready);

    assert_eq!(next_change(&mut rx).await, (Connected, Loading));
    assert_eq!(next_change(&mut rx).await, (Loading, Ready));
    assert_matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty));
}

// ---------------------------------------------------------------------------
// Test: the pass that settles last decides the final state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn last_pass_to_settle_wins() {
    let transport = Arc::new(Gated::new());
    let registry = ScriptRegistry::with_scripts([("a", HELLO)]);
    let loader = ScriptLoader::builder()
        .transport(transport.clone())
        .registry(registry.clone())
        .config(LoaderConfig {
            reload_on_connect: false,
            ..Default::default()
        })
        .build()
        .unwrap();
    let mut rx = loader.subscribe();

    // The first pass snapshots `a` and parks at the gate.
    let slow = loader.load(LoadOptions::default());
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.waiting() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("first pass should reach the transport");

    // The second pass only sees an invalid entry and fails straight away.
    registry.remove("a").await;
    registry.insert("blank", "").await;
    let fast = loader.load(LoadOptions::default()).await;
    assert_matches!(
        fast,
        Err(LoadError::Scripts {
            failed: 1,
            last: ScriptError::Invalid(_),
            ..
        })
    );
    assert_eq!(loader.state(), Connected);

    // Now let the first pass through; it succeeds and settles last.
    transport.open();
    let report = slow.await.unwrap();
    assert_eq!(report.uploaded(), 1);
    assert_eq!(loader.state(), Ready);

    assert_eq!(next_change(&mut rx).await, (Connected, Loading));
    assert_eq!(next_change(&mut rx).await, (Loading, Connected));
    assert_eq!(next_change(&mut rx).await, (Connected, Ready));

    // `a` was removed while it was in flight, so its hash was not recorded.
    assert_eq!(registry.hash("a").await, None);
}

// ---------------------------------------------------------------------------
// Test: a slow failing pass overrides a READY reached by a faster one
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_failure_overrides_earlier_ready() {
    let transport = Arc::new(Gated::over(MemoryStore::new().rejecting("hello")));
    let registry = ScriptRegistry::with_scripts([("a", HELLO)]);
    let loader = ScriptLoader::create(transport.clone(), registry.clone()).unwrap();
    let mut rx = loader.subscribe();

    let slow = loader.load(LoadOptions::default());
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.waiting() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("first pass should reach the transport");

    // With nothing left to load the second pass is READY at once.
    registry.remove("a").await;
    let fast = loader.load(LoadOptions::default()).await.unwrap();
    assert!(fast.is_empty());
    assert_eq!(loader.state(), Ready);

    transport.open();
    let err = slow.await.unwrap_err();
    assert_matches!(
        err,
        LoadError::Scripts {
            failed: 1,
            last: ScriptError::Rejected(_),
            ..
        }
    );
    assert_eq!(loader.state(), Connected);

    assert_eq!(next_change(&mut rx).await, (Connected, Loading));
    assert_eq!(next_change(&mut rx).await, (Loading, Ready));
    assert_eq!(next_change(&mut rx).await, (Ready, Connected));
}

// ---------------------------------------------------------------------------
// Test: a disconnect during a pass fails it and leaves the loader CLOSED
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_mid_pass_resolves_to_closed() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(200)));
    let loader = ScriptLoader::builder()
        .transport(store.clone())
        .registry(hello_bye())
        .config(LoaderConfig {
            reload_on_connect: false,
            ..Default::default()
        })
        .build()
        .unwrap();
    let mut rx = loader.subscribe();

    let pass = loader.load(LoadOptions::forced());
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.disconnect();

    let err = pass.await.unwrap_err();
    assert_matches!(
        err,
        LoadError::Scripts {
            failed: 2,
            last: ScriptError::Transport(TransportError::Io(_)),
            ..
        }
    );
    assert_eq!(loader.state(), Closed);

    assert_eq!(next_change(&mut rx).await, (Connected, Loading));
    assert_eq!(next_change(&mut rx).await, (Loading, Closed));
    assert_eq!(store.script_count().await, 0);
}
