//! The producer lifecycle manager and its publish path.
//!
//! A [`Producer`] walks a small state machine:
//!
//! ```text
//! Uninitialized --init--> Configured --create--> Ready --close--> Closed
//!        |                    |                                     ^
//!        +------ failure -----+--------------> Failed ---close------+
//! ```
//!
//! Only `Ready` accepts [`Producer::produce`]. [`Producer::close`] is valid
//! from every state, is idempotent and runs automatically on drop.
//!
//! # Example
//!
//! ```rust,no_run
//! use mq_producer::{Producer, ProducerConfig};
//!
//! # fn example() -> mq_producer::Result<()> {
//! let mut producer = Producer::connect(ProducerConfig::new("localhost:9092"), None)?;
//! producer.produce(b"{\"id\":1}", "orders", "order")?;
//! let report = producer.close();
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

mod introspect;
mod lifecycle;
mod publish;


use serde::Serialize;
use std::fmt;

use crate::client::ClientConf;
use crate::config::ProducerConfig;
use crate::delivery::SharedSink;
use crate::kafka::KafkaConf;
use crate::{Error, Result};

/// Component name attached to every diagnostic the producer emits.
pub const COMPONENT: &str = "Producer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerState {
    Uninitialized,
    Configured,
    Ready,
    Failed,
    Closed,
}

impl fmt::Display for ProducerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProducerState::Uninitialized => "uninitialized",
            ProducerState::Configured => "configured",
            ProducerState::Ready => "ready",
            ProducerState::Failed => "failed",
            ProducerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What [`Producer::close`] observed while shutting down.
///
/// Shutdown never fails; problems are logged and summarised here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// The producer was already closed; nothing was done.
    pub already_closed: bool,
    pub flushed: bool,
    pub drain_polls: usize,
    /// Messages still unacknowledged when the drain budget ran out.
    pub abandoned: usize,
    /// The client confirmed its background threads stopped in time. With
    /// Kafka this covers every librdkafka handle in the process.
    pub client_stopped: bool,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0 && self.client_stopped
    }
}

/// Publishes byte messages through a broker client it exclusively owns.
pub struct Producer<C: ClientConf = KafkaConf> {
    config: ProducerConfig,
    state: ProducerState,
    conf: Option<C>,
    client: Option<C::Client>,
}

impl Producer<KafkaConf> {
    /// Creates an uninitialized Kafka producer.
    pub fn new(config: ProducerConfig) -> Self {
        Self::with_client_conf(config, KafkaConf::new())
    }

    /// Creates a Kafka producer and initializes it against `config.brokers`.
    pub fn connect(config: ProducerConfig, sink: Option<SharedSink>) -> Result<Self> {
        let brokers = config.brokers.clone();
        let mut producer = Self::new(config);
        producer.init(&brokers, sink)?;
        Ok(producer)
    }
}

impl<C: ClientConf> Producer<C> {
    /// Creates an uninitialized producer over any client implementation.
    pub fn with_client_conf(config: ProducerConfig, conf: C) -> Self {
        Self {
            config,
            state: ProducerState::Uninitialized,
            conf: Some(conf),
            client: None,
        }
    }

    pub fn state(&self) -> ProducerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ProducerState::Ready
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    fn run_status(&self, operation: &'static str) -> Error {
        Error::RunStatus {
            operation,
            state: self.state,
        }
    }

    fn ready_client(&self, operation: &'static str) -> Result<&C::Client> {
        match (self.state, &self.client) {
            (ProducerState::Ready, Some(client)) => Ok(client),
            _ => Err(self.run_status(operation)),
        }
    }
}

impl<C: ClientConf> Drop for Producer<C> {
    fn drop(&mut self) {
        if self.state != ProducerState::Closed {
            self.close();
        }
    }
}
