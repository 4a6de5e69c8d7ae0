//! One-shot waiter registry.
//!
//! The proposal pipeline registers a waiter keyed by request id before
//! submitting to the consensus layer; the apply loop triggers it with the
//! applied result. A waiter that is dropped without being triggered
//! deregisters itself, so abandoned proposals never leak registry entries.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::warn;

pub struct WaiterRegistry<T> {
    waiters: Arc<DashMap<u64, oneshot::Sender<T>>>,
}

impl<T> Clone for WaiterRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            waiters: self.waiters.clone(),
        }
    }
}

impl<T> Default for WaiterRegistry<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WaiterRegistry<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            waiters: Arc::new(DashMap::new()),
        }
    }

    /// Register a one-shot waiter for `id`. Ids are unique per generator;
    /// a duplicate registration is a bug in the caller.
    pub fn register(&self, id: u64) -> WaiterGuard<T> {
        let (tx, rx) = oneshot::channel();
        if self.waiters.insert(id, tx).is_some() {
            debug_assert!(false, "duplicate waiter registration for id {id}");
            warn!(id, "duplicate waiter registration; previous waiter dropped");
        }
        WaiterGuard {
            id,
            rx,
            waiters: self.waiters.clone(),
        }
    }

    /// Deliver the result for `id`. Returns false when nobody is waiting
    /// (the proposer timed out or went away).
    pub fn trigger(&self, id: u64, value: T) -> bool {
        match self.waiters.remove(&id) {
            Some((_, tx)) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_registered(&self, id: u64) -> bool {
        self.waiters.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.waiters.len()
    }
}

/// Receive side of one registered waiter; deregisters on drop.
pub struct WaiterGuard<T> {
    id: u64,
    rx: oneshot::Receiver<T>,
    waiters: Arc<DashMap<u64, oneshot::Sender<T>>>,
}

impl<T> WaiterGuard<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the result. `None` means the registry entry was removed
    /// without a result, which only happens on shutdown paths.
    pub async fn wait(&mut self) -> Option<T> {
        (&mut self.rx).await.ok()
    }
}

impl<T> Drop for WaiterGuard<T> {
    fn drop(&mut self) {
        self.waiters.remove(&self.id);
    }
}
