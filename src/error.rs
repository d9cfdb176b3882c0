//! Error types and result handling for mq-producer.
//!
//! This module defines the main error type [`Error`], the numeric
//! [`ErrorCode`] taxonomy callers can match on or hand across a process
//! boundary, and a convenience [`Result`] type alias used throughout the
//! crate.
//!
//! Every error carries the detail text of the call that produced it; there
//! is no shared "last error" buffer.
//!
//! # Example
//!
//! ```rust
//! use mq_producer::{Error, ErrorCode, Result};
//!
//! fn publish() -> Result<()> {
//!     Err(Error::SendQueueFull {
//!         topic: "orders".to_string(),
//!         detail: "Local: Queue full".to_string(),
//!     })
//! }
//!
//! let result = publish();
//! assert_eq!(ErrorCode::of(&result), ErrorCode::SendQueueFull);
//! assert!(ErrorCode::of(&result).is_retryable());
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::producer::ProducerState;

/// The main error type for producer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The broker address was empty or rejected by the client configuration.
    #[error("Invalid broker address '{address}': {detail}")]
    InitBrokerAddress { address: String, detail: String },

    /// The delivery report sink could not be registered.
    #[error("Failed to register delivery report callback: {0}")]
    InitDeliveryCallback(String),

    /// The client handle could not be created from the configuration.
    #[error("Failed to create producer: {0}")]
    CreateProducer(String),

    /// The outbound queue stayed full after the single recovery attempt.
    #[error("Outbound queue full for topic '{topic}': {detail}")]
    SendQueueFull { topic: String, detail: String },

    /// The payload exceeds the broker or client size limit.
    #[error("Message too large for topic '{topic}': {detail}")]
    SendMsgTooLarge { topic: String, detail: String },

    /// The broker does not know the topic.
    #[error("Broker does not have topic '{topic}': {detail}")]
    SendUnknownTopic { topic: String, detail: String },

    /// Any other send failure.
    #[error("Failed to produce to topic '{topic}': {detail}")]
    SendFail { topic: String, detail: String },

    /// An operation was invoked outside the state it is valid in.
    #[error("Cannot {operation} while producer is {state}")]
    RunStatus {
        operation: &'static str,
        state: ProducerState,
    },

    /// The connection probe reported no reachable broker.
    #[error("Failed to connect broker: {0}")]
    ConnectBroker(String),

    /// A client tuning property was rejected.
    #[error("Invalid client property '{key}': {detail}")]
    InvalidProperty { key: String, detail: String },

    /// Configuration file or environment could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Encoding a structured record into bytes failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InitBrokerAddress { .. } => ErrorCode::InitBrokerAddress,
            Error::InitDeliveryCallback(_) => ErrorCode::InitDeliveryCallback,
            Error::CreateProducer(_) => ErrorCode::CreateProducer,
            Error::SendQueueFull { .. } => ErrorCode::SendQueueFull,
            Error::SendMsgTooLarge { .. } => ErrorCode::SendMsgTooLarge,
            Error::SendUnknownTopic { .. } => ErrorCode::SendUnknownTopic,
            Error::SendFail { .. } => ErrorCode::SendFail,
            Error::RunStatus { .. } => ErrorCode::RunStatus,
            Error::ConnectBroker(_) => ErrorCode::ConnectBroker,
            Error::InvalidProperty { .. } | Error::Config(_) => ErrorCode::InvalidConfig,
            Error::Serialization(_) => ErrorCode::Encode,
        }
    }
}

/// Numeric error codes, stable across releases.
///
/// Producer codes occupy `-1..=-9`, crate-level configuration and encoding
/// failures `-98..=-99` and connectivity `-100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum ErrorCode {
    NoError = 0,
    InitBrokerAddress = -1,
    InitDeliveryCallback = -2,
    CreateProducer = -3,
    /// Reserved; zero-length payloads are valid Kafka values and are sent.
    SendMsgEmpty = -4,
    SendQueueFull = -5,
    SendMsgTooLarge = -6,
    SendUnknownTopic = -7,
    SendFail = -8,
    RunStatus = -9,
    Encode = -98,
    InvalidConfig = -99,
    ConnectBroker = -100,
}

impl ErrorCode {
    /// Maps a result to its code, `NoError` for `Ok`.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ErrorCode::NoError,
            Err(e) => e.code(),
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether the caller may retry the same message later.
    ///
    /// Only a saturated local queue is transient; every other failure needs
    /// an out-of-band fix (smaller payload, topic creation, configuration).
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCode::SendQueueFull)
    }

    /// Initialization failures leave the producer unusable.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::InitBrokerAddress
                | ErrorCode::InitDeliveryCallback
                | ErrorCode::CreateProducer
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_i32())
    }
}

/// A convenient Result type alias for producer operations.
///
/// This is equivalent to `std::result::Result<T, mq_producer::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
