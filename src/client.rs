//! The narrow interface the producer needs from a broker client library.
//!
//! [`ClientConf`] is the mutable configuration object a client handle is
//! created from, [`BrokerClient`] the live handle. The Kafka binding lives in
//! [`crate::kafka`], a scriptable double in [`crate::mock`].

use std::fmt;
use std::time::Duration;

use crate::delivery::SharedSink;

/// Header key the message type tag is carried under.
pub const TYPE_HEADER: &str = "type";

/// One message as handed to [`BrokerClient::send`].
///
/// Everything is borrowed from the caller; the client copies what it keeps.
#[derive(Debug, Clone, Copy)]
pub struct OutboundRecord<'a> {
    pub topic: &'a str,
    /// `None` lets the client's partitioner choose.
    pub partition: Option<i32>,
    pub payload: &'a [u8],
    pub type_tag: &'a str,
}

/// Result of a single non-blocking send attempt.
///
/// Failure variants carry the client library's error text for this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    QueueFull(String),
    TooLarge(String),
    UnknownTopic(String),
    Failed(String),
}

impl SendOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SendOutcome::Accepted)
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            SendOutcome::Accepted => None,
            SendOutcome::QueueFull(detail)
            | SendOutcome::TooLarge(detail)
            | SendOutcome::UnknownTopic(detail)
            | SendOutcome::Failed(detail) => Some(detail),
        }
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOutcome::Accepted => write!(f, "accepted"),
            SendOutcome::QueueFull(detail) => write!(f, "queue full: {}", detail),
            SendOutcome::TooLarge(detail) => write!(f, "too large: {}", detail),
            SendOutcome::UnknownTopic(detail) => write!(f, "unknown topic: {}", detail),
            SendOutcome::Failed(detail) => write!(f, "failed: {}", detail),
        }
    }
}

/// Configuration object a [`BrokerClient`] is created from.
///
/// Setters return the library's rejection text on failure.
pub trait ClientConf {
    type Client: BrokerClient;

    fn set_bootstrap_servers(&mut self, brokers: &str) -> Result<(), String>;

    fn set_property(&mut self, key: &str, value: &str) -> Result<(), String>;

    fn set_delivery_sink(&mut self, sink: SharedSink) -> Result<(), String>;

    fn create(&self) -> Result<Self::Client, String>;
}

/// A live producer handle.
pub trait BrokerClient {
    /// Enqueues one message without blocking.
    fn send(&self, record: &OutboundRecord<'_>) -> SendOutcome;

    /// Serves queued delivery reports, blocking at most `timeout`.
    fn poll_once(&self, timeout: Duration);

    /// Messages enqueued or in flight that have not been reported yet.
    fn outstanding_count(&self) -> usize;

    fn flush(&self, timeout: Duration) -> Result<(), String>;

    fn check_connection(&self, timeout: Duration) -> bool;

    fn list_topics(&self, timeout: Duration) -> Result<Vec<String>, String>;

    /// Destroys the handle and waits up to `timeout` for the library's
    /// background threads to stop. Returns `false` if they did not.
    ///
    /// Implementations may only be able to observe library-wide state, in
    /// which case `false` can also mean some other handle is still alive.
    fn shutdown(self, timeout: Duration) -> bool
    where
        Self: Sized;
}
