//! Watch client for revkv.
//!
//! Many independent subscribers observe key-range changes on the
//! replicated store while sharing a small number of long-lived
//! bidirectional streams:
//!
//! - [`Watcher`] - entry point; groups streams by context metadata
//! - [`WatchContext`] / [`StreamMetadata`] - transport selection and
//!   cancellation
//! - [`WatchOptions`] - per-subscription options (range, revision,
//!   filters, ...)
//! - [`TcpConnector`] - the framed TCP transport; [`WatchConnector`] is
//!   the seam for custom transports
//!
//! Transport failures are repaired transparently: the stream multiplexer
//! re-registers every subscriber from its last observed revision, so a
//! subscriber sees a gap-free, duplicate-free, revision-ordered event
//! sequence - unless the server compacted past the resume point, in which
//! case the subscription ends with [`WatchError::Compacted`].
//!
//! # Basic usage
//!
//! ```no_run
//! use revkv_client::{StreamMetadata, TcpConnector, WatchContext, WatchOptions, Watcher};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let connector = Arc::new(TcpConnector::new(vec!["node1:9281".into()]));
//!     let watcher = Watcher::new(connector);
//!
//!     let (_cancel, ctx) = WatchContext::new(StreamMetadata::new());
//!     let mut changes = watcher
//!         .watch(&ctx, "user:1001", WatchOptions::new().with_prev_kv())
//!         .await;
//!
//!     while let Some(resp) = changes.recv().await {
//!         if let Some(err) = resp.err() {
//!             eprintln!("watch ended: {err}");
//!             break;
//!         }
//!         for event in &resp.events {
//!             println!("observed {:?}", event);
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod response;
mod stream;
mod substream;
mod transport;
mod watcher;

pub use context::{CancelHandle, StreamMetadata, WatchContext, REQUIRE_LEADER_KEY};
pub use error::WatchError;
pub use response::{WatchChan, WatchResponse};
pub use transport::{TcpConnector, WatchChannel, WatchConnector, WatchSink, WatchSource};
pub use watcher::{prefix_range_end, WatchOptions, Watcher};

#[cfg(test)]
mod testutil;

#[cfg(test)]
mod context_test;
#[cfg(test)]
mod substream_test;
