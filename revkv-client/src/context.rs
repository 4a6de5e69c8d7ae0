//! Watch request contexts.
//!
//! A [`WatchContext`] carries the metadata that selects a shared transport
//! and a cancellation signal. Contexts with identical metadata map to the
//! same [`stream_key`](StreamMetadata::stream_key) and therefore share one
//! transport.
//!
//! The multiplexer derives its own context from the caller's: same
//! metadata, independent cancellation. That keeps stream metadata alive
//! even after the caller's context ends.

use std::collections::BTreeMap;

use tokio::sync::watch;

/// Reserved metadata entry callers set to demand the stream refuse to
/// proceed without a cluster leader.
pub const REQUIRE_LEADER_KEY: &str = "has-leader";

/// Sorted string metadata attached to a watch context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    entries: BTreeMap<String, String>,
}

impl StreamMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Demand a cluster leader for every operation on this stream.
    pub fn require_leader(self) -> Self {
        self.with_entry(REQUIRE_LEADER_KEY, "true")
    }

    pub fn requires_leader(&self) -> bool {
        self.entries.get(REQUIRE_LEADER_KEY).map(String::as_str) == Some("true")
    }

    /// Deterministic rendering of the metadata. Identical metadata yields
    /// an identical key, which is what groups watches onto one transport.
    pub fn stream_key(&self) -> String {
        let mut key = String::new();
        for (k, v) in &self.entries {
            if !key.is_empty() {
                key.push(',');
            }
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }
}

/// Cancels the paired [`WatchContext`] when triggered or dropped.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// A cancellable context carrying stream metadata.
#[derive(Debug, Clone)]
pub struct WatchContext {
    metadata: StreamMetadata,
    cancel: watch::Receiver<bool>,
}

impl WatchContext {
    /// Create a context; cancellation fires when the handle is triggered
    /// or dropped.
    pub fn new(metadata: StreamMetadata) -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                metadata,
                cancel: rx,
            },
        )
    }

    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.cancel.has_changed().is_err()
    }

    /// Resolves when the context is cancelled. Safe to race in `select!`.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
