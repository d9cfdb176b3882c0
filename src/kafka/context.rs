use chrono::Utc;
use rdkafka::client::ClientContext;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, DeliveryResult, Headers, Message};
use rdkafka::producer::ProducerContext;
use tracing::{debug, error, info, warn};

use crate::client::TYPE_HEADER;
use crate::delivery::{DeliveryReport, DeliveryStatus, SharedSink};

/// Client context that forwards delivery reports to the registered sink
/// and librdkafka's own diagnostics to `tracing`.
pub struct DeliveryContext {
    sink: Option<SharedSink>,
}

impl DeliveryContext {
    pub fn new(sink: Option<SharedSink>) -> Self {
        Self { sink }
    }
}

impl ClientContext for DeliveryContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => error!(target: "librdkafka", facility = fac, "{}", log_message),
            RDKafkaLogLevel::Warning => warn!(target: "librdkafka", facility = fac, "{}", log_message),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
                info!(target: "librdkafka", facility = fac, "{}", log_message)
            }
            RDKafkaLogLevel::Debug => debug!(target: "librdkafka", facility = fac, "{}", log_message),
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        error!(component = "Producer", error = %error, "librdkafka error: {}", reason);
    }
}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _delivery_opaque: Self::DeliveryOpaque) {
        let Some(sink) = &self.sink else {
            return;
        };
        let report = match delivery_result {
            Ok(message) => report_from_message(message, DeliveryStatus::Delivered),
            Err((err, message)) => report_from_message(
                message,
                DeliveryStatus::Failed {
                    error: err.to_string(),
                },
            ),
        };
        sink.on_delivery(&report);
    }
}

fn report_from_message(message: &BorrowedMessage<'_>, status: DeliveryStatus) -> DeliveryReport {
    let type_tag = message.headers().and_then(|headers| {
        headers
            .iter()
            .find(|header| header.key == TYPE_HEADER)
            .and_then(|header| header.value)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    });

    DeliveryReport {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        payload_len: message.payload().map_or(0, <[u8]>::len),
        type_tag,
        status,
        reported_at: Utc::now(),
    }
}
