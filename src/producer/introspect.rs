use tracing::warn;

use super::{Producer, COMPONENT};
use crate::client::{BrokerClient, ClientConf};
use crate::{Error, Result};

impl<C: ClientConf> Producer<C> {
    /// Probes the brokers through the live handle; `false` without one.
    pub fn check_connection(&self) -> bool {
        match &self.client {
            Some(client) => client.check_connection(self.config.timeouts.metadata()),
            None => false,
        }
    }

    /// Like [`Producer::check_connection`], as an error for `?` callers.
    pub fn require_connection(&self) -> Result<()> {
        if self.check_connection() {
            Ok(())
        } else {
            Err(Error::ConnectBroker(format!(
                "no broker reachable at '{}'",
                self.config.brokers
            )))
        }
    }

    /// Topics the brokers currently report, sorted by name.
    ///
    /// Empty when there is no handle or the metadata request fails.
    pub fn list_broker_topics(&self) -> Vec<String> {
        let Some(client) = &self.client else {
            return Vec::new();
        };

        match client.list_topics(self.config.timeouts.metadata()) {
            Ok(mut topics) => {
                topics.sort();
                topics
            }
            Err(e) => {
                warn!(component = COMPONENT, error = %e, "Failed to list broker topics");
                Vec::new()
            }
        }
    }
}
