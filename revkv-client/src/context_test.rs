use std::time::Duration;

use tokio::time::timeout;

use crate::context::{StreamMetadata, WatchContext};

#[test]
fn stream_key_is_deterministic_and_sorted() {
    let a = StreamMetadata::new()
        .with_entry("zone", "eu-1")
        .with_entry("app", "billing");
    let b = StreamMetadata::new()
        .with_entry("app", "billing")
        .with_entry("zone", "eu-1");

    assert_eq!(a.stream_key(), b.stream_key());
    assert_eq!(a.stream_key(), "app=billing,zone=eu-1");
    assert_eq!(StreamMetadata::new().stream_key(), "");
}

#[test]
fn differing_metadata_differs_in_key() {
    let a = StreamMetadata::new().with_entry("app", "billing");
    let b = StreamMetadata::new().with_entry("app", "audit");
    assert_ne!(a.stream_key(), b.stream_key());
}

#[test]
fn require_leader_is_a_reserved_entry() {
    let meta = StreamMetadata::new().require_leader();
    assert!(meta.requires_leader());
    assert!(!StreamMetadata::new().requires_leader());
    assert_ne!(meta.stream_key(), StreamMetadata::new().stream_key());
}

#[tokio::test]
async fn cancel_fires_the_context() {
    let (handle, ctx) = WatchContext::new(StreamMetadata::new());
    assert!(!ctx.is_cancelled());

    handle.cancel();
    assert!(ctx.is_cancelled());
    timeout(Duration::from_millis(100), ctx.cancelled())
        .await
        .expect("cancelled() should resolve after cancel");
}

#[tokio::test]
async fn dropping_the_handle_cancels() {
    let (handle, ctx) = WatchContext::new(StreamMetadata::new());
    drop(handle);

    assert!(ctx.is_cancelled());
    timeout(Duration::from_millis(100), ctx.cancelled())
        .await
        .expect("cancelled() should resolve after handle drop");
}

#[tokio::test]
async fn cancelled_pends_while_context_is_live() {
    let (_handle, ctx) = WatchContext::new(StreamMetadata::new());
    assert!(
        timeout(Duration::from_millis(50), ctx.cancelled())
            .await
            .is_err(),
        "cancelled() must not resolve for a live context"
    );
}

#[tokio::test]
async fn clones_share_the_cancellation_signal() {
    let (handle, ctx) = WatchContext::new(StreamMetadata::new());
    let clone = ctx.clone();
    handle.cancel();
    assert!(clone.is_cancelled());
}
