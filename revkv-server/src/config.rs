//! Configuration knobs consumed by the proposal pipeline.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Stop admitting proposals once the committed index runs ahead of the
/// applied index by more than this many entries. A small gap is healthy;
/// a growing one means apply cannot keep up.
pub const MAX_GAP_BETWEEN_APPLY_AND_COMMIT_INDEX: u64 = 5000;

/// Cadence at which a pending read-index request is re-issued.
pub const READ_INDEX_RETRY_TIME: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Reject marshalled records larger than this.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Election timeout in ticks.
    #[serde(default = "default_election_ticks")]
    pub election_ticks: u64,

    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Base per-request timeout in milliseconds, before the election
    /// allowance.
    #[serde(default = "default_base_request_timeout_ms")]
    pub base_request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: default_max_request_bytes(),
            election_ticks: default_election_ticks(),
            tick_ms: default_tick_ms(),
            base_request_timeout_ms: default_base_request_timeout_ms(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional file, overridden by `REVKV_*` environment
    /// variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("REVKV"))
            .build()?
            .try_deserialize()
    }

    /// Worst-case window for a proposal to commit: the base timeout plus
    /// two election timeouts to ride out one leader change.
    pub fn req_timeout(&self) -> Duration {
        Duration::from_millis(self.base_request_timeout_ms + 2 * self.election_ticks * self.tick_ms)
    }

    pub fn election_timeout(&self) -> Duration {
        Duration::from_millis(self.election_ticks * self.tick_ms)
    }
}

fn default_max_request_bytes() -> usize {
    // 1.5 MiB, the conventional bound for a replicated-log entry.
    1536 * 1024
}

fn default_election_ticks() -> u64 {
    10
}

fn default_tick_ms() -> u64 {
    100
}

fn default_base_request_timeout_ms() -> u64 {
    5000
}
