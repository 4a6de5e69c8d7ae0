//! Unique request-id generation.
//!
//! Ids embed the member id so concurrent proposers across the cluster
//! never collide, and a boot-time timestamp so restarts of the same member
//! do not reuse ids:
//!
//! ```text
//! | member id (16 bits) | timestamp ms (40 bits) | counter (8 bits) |
//! ```
//!
//! The low 48 bits increment atomically per request, so the counter
//! overflows into the timestamp field and ids stay strictly increasing
//! within a process lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const TIMESTAMP_BITS: u32 = 40;
const COUNTER_BITS: u32 = 8;
const SUFFIX_BITS: u32 = TIMESTAMP_BITS + COUNTER_BITS;

#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: u64,
    suffix: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new(member_id: u16) -> Self {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            prefix: u64::from(member_id) << SUFFIX_BITS,
            suffix: AtomicU64::new(low_bits(unix_ms, TIMESTAMP_BITS) << COUNTER_BITS),
        }
    }

    /// Next unique id, strictly increasing per generator.
    pub fn next(&self) -> u64 {
        let suffix = self.suffix.fetch_add(1, Ordering::Relaxed) + 1;
        self.prefix | low_bits(suffix, SUFFIX_BITS)
    }
}

fn low_bits(value: u64, bits: u32) -> u64 {
    value & ((1 << bits) - 1)
}
