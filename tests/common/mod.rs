#![allow(dead_code)]

use mq_producer::config::{ProducerConfig, TimeoutConfig};
use std::env;

/// Get test configuration from environment variables
pub fn get_test_config() -> ProducerConfig {
    // Use TEST_ prefix for test environment variables
    let brokers = env::var("TEST_KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string());

    let mut config = ProducerConfig::new(brokers);
    config.client_id = Some(format!("mq-producer-test-{}", std::process::id()));
    config.linger_ms = 0; // Immediate sending for tests
    config.timeouts = TimeoutConfig {
        poll_ms: 100,
        flush_ms: 5000,
        drain_ms: 10_000,
        shutdown_ms: 5000,
        metadata_ms: 5000,
    };
    config
}

/// Unique topic name so parallel runs do not see each other's messages
pub fn test_topic(name: &str) -> String {
    format!("test_{}_{}", name, std::process::id())
}

/// Millisecond timeouts for tests driven by the mock client
pub fn mock_config() -> ProducerConfig {
    ProducerConfig::new("mock:9092").with_timeouts(TimeoutConfig {
        poll_ms: 1,
        flush_ms: 1,
        drain_ms: 2000,
        shutdown_ms: 1,
        metadata_ms: 1,
    })
}
