use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer as _};
use std::os::raw::c_int;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::{BrokerClient, OutboundRecord, SendOutcome, TYPE_HEADER};
use crate::kafka::context::DeliveryContext;

/// [`BrokerClient`] backed by an rdkafka [`BaseProducer`].
pub struct KafkaClient {
    producer: BaseProducer<DeliveryContext>,
}

impl KafkaClient {
    pub(crate) fn new(producer: BaseProducer<DeliveryContext>) -> Self {
        Self { producer }
    }
}

impl BrokerClient for KafkaClient {
    fn send(&self, record: &OutboundRecord<'_>) -> SendOutcome {
        let headers = OwnedHeaders::new().insert(Header {
            key: TYPE_HEADER,
            value: Some(record.type_tag),
        });

        let mut base: BaseRecord<'_, (), [u8]> = BaseRecord::to(record.topic)
            .payload(record.payload)
            .headers(headers);
        if let Some(partition) = record.partition {
            base = base.partition(partition);
        }

        match self.producer.send(base) {
            Ok(()) => SendOutcome::Accepted,
            Err((err, _)) => classify(&err),
        }
    }

    fn poll_once(&self, timeout: Duration) {
        self.producer.poll(timeout);
    }

    fn outstanding_count(&self) -> usize {
        usize::try_from(self.producer.in_flight_count()).unwrap_or(0)
    }

    fn flush(&self, timeout: Duration) -> Result<(), String> {
        self.producer.flush(timeout).map_err(|e| e.to_string())
    }

    fn check_connection(&self, timeout: Duration) -> bool {
        match self.producer.client().fetch_metadata(None, timeout) {
            Ok(metadata) => !metadata.brokers().is_empty(),
            Err(e) => {
                debug!("Connection probe failed: {}", e);
                false
            }
        }
    }

    fn list_topics(&self, timeout: Duration) -> Result<Vec<String>, String> {
        let metadata = self
            .producer
            .client()
            .fetch_metadata(None, timeout)
            .map_err(|e| e.to_string())?;

        Ok(metadata
            .topics()
            .iter()
            .filter(|topic| topic.error().is_none())
            .map(|topic| topic.name().to_string())
            .collect())
    }

    /// Drops the producer and waits for librdkafka to finish tearing down.
    ///
    /// `rd_kafka_wait_destroyed` counts every librdkafka handle in the
    /// process, not just this one. While any other producer or consumer is
    /// alive this waits the full `timeout` and returns `false`.
    fn shutdown(self, timeout: Duration) -> bool {
        // Dropping the producer destroys the librdkafka handle; the wait
        // below confirms its background threads are gone.
        drop(self.producer);

        let timeout_ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        // SAFETY: rd_kafka_wait_destroyed takes no pointers and only reads
        // librdkafka's process-wide handle counters.
        let rc = unsafe { rdkafka::bindings::rd_kafka_wait_destroyed(timeout_ms) };
        if rc != 0 {
            warn!(
                component = "Producer",
                "librdkafka handles in this process still alive after {}ms", timeout_ms
            );
        }
        rc == 0
    }
}

/// Maps a failed enqueue to the outcome the publish path acts on.
pub(crate) fn classify(err: &KafkaError) -> SendOutcome {
    let detail = err.to_string();
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::QueueFull) => SendOutcome::QueueFull(detail),
        Some(RDKafkaErrorCode::MessageSizeTooLarge) => SendOutcome::TooLarge(detail),
        Some(RDKafkaErrorCode::UnknownTopic | RDKafkaErrorCode::UnknownTopicOrPartition) => {
            SendOutcome::UnknownTopic(detail)
        }
        _ => SendOutcome::Failed(detail),
    }
}
