use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Settings for one producer instance.
///
/// Loaded once, then frozen: after a successful `init` the producer only
/// hands out shared references to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    /// Comma separated bootstrap list, e.g. `"kafka-1:9092,kafka-2:9092"`.
    pub brokers: String,
    /// Target partition; `None` leaves the choice to the partitioner.
    #[serde(default)]
    pub partition: Option<i32>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_acks")]
    pub acks: String,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u32,
    #[serde(default = "default_queue_buffering_max_messages")]
    pub queue_buffering_max_messages: u32,
    #[serde(default = "default_message_max_bytes")]
    pub message_max_bytes: u32,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Fixed waits used by the publish path and the shutdown protocol.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    #[serde(default = "default_flush_ms")]
    pub flush_ms: u64,
    /// Upper bound on waiting for outstanding messages during `close`.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
    #[serde(default = "default_shutdown_ms")]
    pub shutdown_ms: u64,
    #[serde(default = "default_metadata_ms")]
    pub metadata_ms: u64,
}

impl ProducerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            partition: None,
            client_id: None,
            compression: default_compression(),
            acks: default_acks(),
            linger_ms: default_linger_ms(),
            queue_buffering_max_messages: default_queue_buffering_max_messages(),
            message_max_bytes: default_message_max_bytes(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Loads settings from a file, overridden by `MQ_PRODUCER_*` variables.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `MQ_PRODUCER_TIMEOUTS__DRAIN_MS=10000`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("MQ_PRODUCER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Client properties applied on top of the bootstrap address.
    pub fn client_properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![
            ("compression.type", self.compression.clone()),
            ("acks", self.acks.clone()),
            ("linger.ms", self.linger_ms.to_string()),
            (
                "queue.buffering.max.messages",
                self.queue_buffering_max_messages.to_string(),
            ),
            ("message.max.bytes", self.message_max_bytes.to_string()),
        ];
        if let Some(client_id) = &self.client_id {
            props.push(("client.id", client_id.clone()));
        }
        props
    }
}

impl TimeoutConfig {
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn flush(&self) -> Duration {
        Duration::from_millis(self.flush_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_millis(self.shutdown_ms)
    }

    pub fn metadata(&self) -> Duration {
        Duration::from_millis(self.metadata_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            poll_ms: default_poll_ms(),
            flush_ms: default_flush_ms(),
            drain_ms: default_drain_ms(),
            shutdown_ms: default_shutdown_ms(),
            metadata_ms: default_metadata_ms(),
        }
    }
}

fn default_compression() -> String {
    "none".to_string()
}

fn default_acks() -> String {
    "all".to_string()
}

fn default_linger_ms() -> u32 {
    5
}

fn default_queue_buffering_max_messages() -> u32 {
    100_000
}

fn default_message_max_bytes() -> u32 {
    1_000_000
}

fn default_poll_ms() -> u64 {
    1000
}

fn default_flush_ms() -> u64 {
    5000
}

fn default_drain_ms() -> u64 {
    30_000
}

fn default_shutdown_ms() -> u64 {
    5000
}

fn default_metadata_ms() -> u64 {
    5000
}
