//! # revkv-proto
//!
//! Wire protocol definitions for revkv - foundation for the client and
//! server crates.
//!
//! ## What this crate provides
//!
//! - [`kv`] - key-value records, events and response headers
//! - [`watch`] - the watch stream frames exchanged between a client and a
//!   server endpoint
//! - [`record`] - the replicated-log record types consumed by the server's
//!   applier
//! - [`codec`] - the length-prefixed frame codec used on the wire
//!
//! All message types are plain prost messages; the protocol is private to
//! revkv, so the types are written by hand rather than generated from
//! `.proto` files. Field tags are stable and may not be reused.
//!
//! ## For Rust users
//!
//! If you're writing Rust code, use [`revkv`](https://crates.io/crates/revkv)
//! or `revkv-client` instead - they provide higher-level APIs on top of
//! these protocol definitions.

pub mod codec;
pub mod kv;
pub mod record;
pub mod watch;

pub mod exts;

#[cfg(test)]
mod codec_test;
