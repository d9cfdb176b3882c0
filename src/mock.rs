//! A scriptable in-memory broker client for tests.
//!
//! [`MockBroker`] owns the shared state; [`MockBroker::conf`] hands out a
//! [`MockConf`] to build a producer from, and the broker stays around to
//! script outcomes and inspect what the producer did.
//!
//! Only compiled with the `mock` feature.
//!
//! ```rust
//! use mq_producer::mock::MockBroker;
//! use mq_producer::{Producer, ProducerConfig};
//!
//! let broker = MockBroker::new();
//! let mut producer = Producer::with_client_conf(ProducerConfig::new("mock:9092"), broker.conf());
//! producer.init("mock:9092", None).unwrap();
//! producer.produce(b"hello", "greetings", "text").unwrap();
//!
//! assert_eq!(broker.sent().len(), 1);
//! assert_eq!(broker.sent()[0].payload, b"hello");
//! ```

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::client::{BrokerClient, ClientConf, OutboundRecord, SendOutcome};
use crate::delivery::{DeliveryReport, DeliveryStatus, SharedSink};

/// A message the mock accepted or refused, copied out of the send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub topic: String,
    pub partition: Option<i32>,
    pub payload: Vec<u8>,
    pub type_tag: String,
    pub accepted: bool,
}

#[derive(Debug)]
struct MockState {
    script: VecDeque<SendOutcome>,
    sent: Vec<SentRecord>,
    pending: VecDeque<DeliveryReport>,
    outstanding: usize,
    acks_per_poll: usize,
    poll_delay: Duration,
    poll_calls: usize,
    flush_calls: usize,
    shutdown_calls: usize,
    confs_released: usize,
    connected: bool,
    topics: Vec<String>,
    reject_bootstrap: Option<String>,
    reject_sink: Option<String>,
    fail_create: Option<String>,
    bootstrap: Option<String>,
    properties: Vec<(String, String)>,
    next_offset: i64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            sent: Vec::new(),
            pending: VecDeque::new(),
            outstanding: 0,
            acks_per_poll: 1,
            poll_delay: Duration::ZERO,
            poll_calls: 0,
            flush_calls: 0,
            shutdown_calls: 0,
            confs_released: 0,
            connected: true,
            topics: Vec::new(),
            reject_bootstrap: None,
            reject_sink: None,
            fail_create: None,
            bootstrap: None,
            properties: Vec::new(),
            next_offset: 0,
        }
    }
}

/// Shared handle to the mock's state.
#[derive(Debug, Clone, Default)]
pub struct MockBroker {
    state: Arc<Mutex<MockState>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    pub fn conf(&self) -> MockConf {
        MockConf {
            state: self.state.clone(),
            sink: None,
        }
    }

    /// Queues outcomes returned by the next sends, in order. Once the
    /// script runs out every send is accepted.
    pub fn script_sends<I>(&self, outcomes: I)
    where
        I: IntoIterator<Item = SendOutcome>,
    {
        self.lock().script.extend(outcomes);
    }

    /// Pretends `count` messages are already waiting for acknowledgment.
    pub fn set_outstanding(&self, count: usize) {
        self.lock().outstanding = count;
    }

    /// How many outstanding messages each `poll_once` acknowledges.
    pub fn set_acks_per_poll(&self, acks: usize) {
        self.lock().acks_per_poll = acks;
    }

    /// Makes every `poll_once` sleep, capped by the caller's timeout.
    pub fn set_poll_delay(&self, delay: Duration) {
        self.lock().poll_delay = delay;
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn set_topics<I, S>(&self, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().topics = topics.into_iter().map(Into::into).collect();
    }

    pub fn reject_bootstrap(&self, reason: impl Into<String>) {
        self.lock().reject_bootstrap = Some(reason.into());
    }

    pub fn reject_delivery_sink(&self, reason: impl Into<String>) {
        self.lock().reject_sink = Some(reason.into());
    }

    pub fn fail_create(&self, reason: impl Into<String>) {
        self.lock().fail_create = Some(reason.into());
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.lock().sent.clone()
    }

    pub fn send_calls(&self) -> usize {
        self.lock().sent.len()
    }

    pub fn poll_calls(&self) -> usize {
        self.lock().poll_calls
    }

    pub fn flush_calls(&self) -> usize {
        self.lock().flush_calls
    }

    pub fn shutdown_calls(&self) -> usize {
        self.lock().shutdown_calls
    }

    pub fn confs_released(&self) -> usize {
        self.lock().confs_released
    }

    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    pub fn bootstrap(&self) -> Option<String> {
        self.lock().bootstrap.clone()
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.lock()
            .properties
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

/// Configuration object of the mock client.
pub struct MockConf {
    state: Arc<Mutex<MockState>>,
    sink: Option<SharedSink>,
}

impl ClientConf for MockConf {
    type Client = MockClient;

    fn set_bootstrap_servers(&mut self, brokers: &str) -> Result<(), String> {
        let mut state = lock(&self.state);
        if let Some(reason) = &state.reject_bootstrap {
            return Err(reason.clone());
        }
        state.bootstrap = Some(brokers.to_string());
        Ok(())
    }

    fn set_property(&mut self, key: &str, value: &str) -> Result<(), String> {
        lock(&self.state)
            .properties
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn set_delivery_sink(&mut self, sink: SharedSink) -> Result<(), String> {
        if let Some(reason) = &lock(&self.state).reject_sink {
            return Err(reason.clone());
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn create(&self) -> Result<MockClient, String> {
        if let Some(reason) = &lock(&self.state).fail_create {
            return Err(reason.clone());
        }
        Ok(MockClient {
            state: self.state.clone(),
            sink: self.sink.clone(),
        })
    }
}

impl Drop for MockConf {
    fn drop(&mut self) {
        lock(&self.state).confs_released += 1;
    }
}

/// Live handle of the mock client.
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
    sink: Option<SharedSink>,
}

impl BrokerClient for MockClient {
    fn send(&self, record: &OutboundRecord<'_>) -> SendOutcome {
        let mut state = lock(&self.state);
        let outcome = state.script.pop_front().unwrap_or(SendOutcome::Accepted);
        let accepted = outcome.is_accepted();

        state.sent.push(SentRecord {
            topic: record.topic.to_string(),
            partition: record.partition,
            payload: record.payload.to_vec(),
            type_tag: record.type_tag.to_string(),
            accepted,
        });

        if accepted {
            let offset = state.next_offset;
            state.next_offset += 1;
            state.outstanding += 1;
            state.pending.push_back(DeliveryReport {
                topic: record.topic.to_string(),
                partition: record.partition.unwrap_or(0),
                offset,
                payload_len: record.payload.len(),
                type_tag: Some(record.type_tag.to_string()),
                status: DeliveryStatus::Delivered,
                reported_at: Utc::now(),
            });
        }
        outcome
    }

    fn poll_once(&self, timeout: Duration) {
        let (delay, reports) = {
            let mut state = lock(&self.state);
            state.poll_calls += 1;

            let acked = state.acks_per_poll.min(state.outstanding);
            state.outstanding -= acked;
            let ready = acked.min(state.pending.len());
            let reports: Vec<_> = state.pending.drain(..ready).collect();
            (state.poll_delay.min(timeout), reports)
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        // Outside the lock so sinks may inspect the broker
        if let Some(sink) = &self.sink {
            for report in &reports {
                sink.on_delivery(report);
            }
        }
    }

    fn outstanding_count(&self) -> usize {
        lock(&self.state).outstanding
    }

    fn flush(&self, _timeout: Duration) -> Result<(), String> {
        lock(&self.state).flush_calls += 1;
        Ok(())
    }

    fn check_connection(&self, _timeout: Duration) -> bool {
        lock(&self.state).connected
    }

    fn list_topics(&self, _timeout: Duration) -> Result<Vec<String>, String> {
        let state = lock(&self.state);
        if !state.connected {
            return Err("Local: Broker transport failure".to_string());
        }
        Ok(state.topics.clone())
    }

    fn shutdown(self, _timeout: Duration) -> bool {
        lock(&self.state).shutdown_calls += 1;
        true
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<'a>(payload: &'a [u8]) -> OutboundRecord<'a> {
        OutboundRecord {
            topic: "t",
            partition: None,
            payload,
            type_tag: "",
        }
    }

    #[test]
    fn test_script_then_accept() {
        let broker = MockBroker::new();
        broker.script_sends([SendOutcome::QueueFull("full".to_string())]);
        let client = broker.conf().create().unwrap();

        assert_eq!(
            client.send(&record(b"a")),
            SendOutcome::QueueFull("full".to_string())
        );
        assert_eq!(client.send(&record(b"a")), SendOutcome::Accepted);
        assert_eq!(client.outstanding_count(), 1);
    }

    #[test]
    fn test_poll_acknowledges() {
        let broker = MockBroker::new();
        let client = broker.conf().create().unwrap();
        broker.set_outstanding(2);

        client.poll_once(Duration::from_millis(1));
        assert_eq!(client.outstanding_count(), 1);
        client.poll_once(Duration::from_millis(1));
        client.poll_once(Duration::from_millis(1));
        assert_eq!(client.outstanding_count(), 0);
        assert_eq!(broker.poll_calls(), 3);
    }

    #[test]
    fn test_conf_drop_is_counted() {
        let broker = MockBroker::new();
        drop(broker.conf());
        assert_eq!(broker.confs_released(), 1);
    }
}
