use tracing::{debug, error, warn};

use super::{Producer, COMPONENT};
use crate::client::{BrokerClient, ClientConf, OutboundRecord, SendOutcome};
use crate::{Error, Result};

impl<C: ClientConf> Producer<C> {
    /// Enqueues one message for `topic`, tagged with `type_tag`.
    ///
    /// The payload is borrowed and copied by the client; an empty slice is
    /// sent as a zero-length value. `Ok` means the message entered the
    /// client's queue; the broker's verdict arrives later through the
    /// delivery report sink.
    ///
    /// A full queue is retried once after a poll. Every call that reaches
    /// the client ends with one more poll to serve delivery reports, so a
    /// call may block for up to two poll timeouts.
    pub fn produce(&self, payload: &[u8], topic: &str, type_tag: &str) -> Result<()> {
        let client = match self.ready_client("produce") {
            Ok(client) => client,
            Err(err) => {
                warn!(component = COMPONENT, topic, "{}", err);
                return Err(err);
            }
        };

        let record = OutboundRecord {
            topic,
            partition: self.config.partition,
            payload,
            type_tag,
        };
        let result = self.send_with_retry(client, &record);

        client.poll_once(self.config.timeouts.poll());
        result
    }

    fn send_with_retry(&self, client: &C::Client, record: &OutboundRecord<'_>) -> Result<()> {
        let mut outcome = client.send(record);

        if let SendOutcome::QueueFull(detail) = &outcome {
            warn!(
                component = COMPONENT,
                topic = record.topic,
                error = %detail,
                "Outbound queue full, polling before retry"
            );
            client.poll_once(self.config.timeouts.poll());
            outcome = client.send(record);
        }

        let topic = record.topic.to_string();
        let err = match outcome {
            SendOutcome::Accepted => {
                debug!(
                    component = COMPONENT,
                    topic = record.topic,
                    bytes = record.payload.len(),
                    "Enqueued message"
                );
                return Ok(());
            }
            SendOutcome::QueueFull(detail) => Error::SendQueueFull { topic, detail },
            SendOutcome::TooLarge(detail) => Error::SendMsgTooLarge { topic, detail },
            SendOutcome::UnknownTopic(detail) => Error::SendUnknownTopic { topic, detail },
            SendOutcome::Failed(detail) => Error::SendFail { topic, detail },
        };

        error!(
            component = COMPONENT,
            topic = record.topic,
            code = %err.code(),
            "{}",
            err
        );
        Err(err)
    }
}
