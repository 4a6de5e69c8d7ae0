//! # revkv - Unified API
//!
//! Watch multiplexing client and proposal pipeline for a replicated
//! key-value store.
//!
//! ## Crate Organization
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | **`revkv`** | Unified API (this crate) |
//! | `revkv-client` | Watch client: facade, stream multiplexer, transport |
//! | `revkv-server` | Proposal pipeline, applier switch, downgrade control |
//! | `revkv-proto` | Wire protocol and replicated-log record types |
//!
//! ## Features
//!
//! - `client` (default) - the watch client
//! - `server` (default) - the proposal pipeline
//!
//! ## Watching keys
//!
//! ```rust,ignore
//! use revkv::prelude::*;
//! use std::sync::Arc;
//!
//! let watcher = Watcher::new(Arc::new(TcpConnector::new(endpoints)));
//! let (_cancel, ctx) = WatchContext::new(StreamMetadata::new());
//! let mut changes = watcher.watch(&ctx, "user:", WatchOptions::new().with_prefix()).await;
//! while let Some(resp) = changes.recv().await {
//!     // revision-ordered, gap-free, duplicate-free
//! }
//! ```

pub use revkv_proto as proto;

#[cfg(feature = "client")]
pub use revkv_client::*;

#[cfg(feature = "server")]
pub use revkv_server::*;

/// Convenient prelude for importing common types
pub mod prelude {
    #[cfg(feature = "client")]
    pub use revkv_client::{
        StreamMetadata, TcpConnector, WatchChan, WatchContext, WatchError, WatchOptions,
        WatchResponse, Watcher,
    };

    #[cfg(feature = "server")]
    pub use revkv_server::{
        Applier, DowngradeApi, PipelineDependencies, ProposalPipeline, ProposeContext,
        ServerConfig,
    };
}
