pub mod client;
pub mod config;
pub mod delivery;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod producer;
pub mod serializer;

pub mod kafka;

pub use client::{BrokerClient, ClientConf, OutboundRecord, SendOutcome};
pub use config::{ProducerConfig, TimeoutConfig};
pub use delivery::{DeliveryReport, DeliveryReportSink, DeliveryStatus, SharedSink};
pub use error::{Error, ErrorCode, Result};
pub use producer::{Producer, ProducerState, ShutdownReport};
pub use serializer::{EncodedMessage, JsonSerializer, SerializationFormat};
