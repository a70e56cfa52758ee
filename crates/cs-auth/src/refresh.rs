use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::debug;

use crate::errors::RefreshError;
use crate::session::TokenPair;

/// Result every waiter of one refresh observes. `Ok(None)` means the new
/// credentials travel in cookies only.
pub type RefreshOutcome = Result<Option<TokenPair>, RefreshError>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;
type Slot = Arc<Mutex<Option<SharedRefresh>>>;

/// Single-flight gate for the refresh call.
///
/// At most one refresh future exists at a time. Callers that arrive while it
/// is pending await the same shared future instead of starting their own.
/// The slot is emptied inside that future, before it resolves, so no waiter
/// is released while the marker still exists and a later failure can start a
/// fresh refresh instead of awaiting a settled one.
#[derive(Default)]
pub struct RefreshCoordinator {
    in_flight: Slot,
    started: AtomicU64,
}

fn lock(slot: &Slot) -> MutexGuard<'_, Option<SharedRefresh>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the pending refresh, or start one with `start` if none is
    /// pending. `start` runs at most once per refresh window.
    pub async fn run<F>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        self.join_or_start(start).await
    }

    fn join_or_start<F>(&self, start: F) -> SharedRefresh
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let mut slot = lock(&self.in_flight);
        if let Some(pending) = slot.as_ref() {
            debug!("Joining in-flight token refresh");
            return pending.clone();
        }

        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Starting token refresh");

        let operation = start();
        let marker = self.in_flight.clone();
        let shared = async move {
            let outcome = operation.await;
            lock(&marker).take();
            outcome
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Number of refresh operations started so far
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("started", &self.refreshes_started())
            .finish()
    }
}
