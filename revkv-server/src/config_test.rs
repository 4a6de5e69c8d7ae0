use std::time::Duration;

use crate::config::{ServerConfig, MAX_GAP_BETWEEN_APPLY_AND_COMMIT_INDEX, READ_INDEX_RETRY_TIME};

#[test]
fn defaults_are_sane() {
    let config = ServerConfig::default();
    assert_eq!(config.max_request_bytes, 1536 * 1024);
    assert_eq!(config.election_ticks, 10);
    assert_eq!(config.tick_ms, 100);
    assert_eq!(config.base_request_timeout_ms, 5000);
}

#[test]
fn req_timeout_adds_two_election_timeouts() {
    let config = ServerConfig {
        base_request_timeout_ms: 5000,
        election_ticks: 10,
        tick_ms: 100,
        ..ServerConfig::default()
    };
    // 5s base + 2 * (10 ticks * 100ms)
    assert_eq!(config.req_timeout(), Duration::from_millis(7000));
    assert_eq!(config.election_timeout(), Duration::from_millis(1000));
}

#[test]
fn partial_config_files_fall_back_to_defaults() {
    let loaded: ServerConfig = config::Config::builder()
        .add_source(config::File::from_str(
            "max_request_bytes = 1024\n",
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    assert_eq!(loaded.max_request_bytes, 1024);
    assert_eq!(loaded.election_ticks, 10, "unset fields use serde defaults");
}

#[test]
fn admission_and_retry_constants() {
    assert_eq!(MAX_GAP_BETWEEN_APPLY_AND_COMMIT_INDEX, 5000);
    assert_eq!(READ_INDEX_RETRY_TIME, Duration::from_millis(500));
}
