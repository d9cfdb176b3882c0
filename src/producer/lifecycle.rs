use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::{Producer, ProducerState, ShutdownReport, COMPONENT};
use crate::client::{BrokerClient, ClientConf};
use crate::config::TimeoutConfig;
use crate::delivery::SharedSink;
use crate::{Error, Result};

impl<C: ClientConf> Producer<C> {
    /// Configures the client and creates its handle.
    ///
    /// Valid only once, from `Uninitialized`. Any failure is fatal to this
    /// instance: the producer moves to `Failed` and only `close` remains
    /// meaningful.
    #[instrument(skip(self, sink), fields(component = COMPONENT))]
    pub fn init(&mut self, broker_addr: &str, sink: Option<SharedSink>) -> Result<()> {
        if self.state != ProducerState::Uninitialized {
            let err = self.run_status("init");
            warn!(component = COMPONENT, "{}", err);
            return Err(err);
        }

        let result = self.configure_and_create(broker_addr, sink);
        if let Err(e) = &result {
            error!(component = COMPONENT, error = %e, "Producer initialization failed");
            self.state = ProducerState::Failed;
        }
        result
    }

    fn configure_and_create(&mut self, broker_addr: &str, sink: Option<SharedSink>) -> Result<()> {
        let broker_addr = broker_addr.trim();
        if broker_addr.is_empty() {
            return Err(Error::InitBrokerAddress {
                address: String::new(),
                detail: "broker address is empty".to_string(),
            });
        }
        self.config.brokers = broker_addr.to_string();

        let conf = self
            .conf
            .as_mut()
            .ok_or_else(|| Error::CreateProducer("client configuration was released".to_string()))?;

        conf.set_bootstrap_servers(broker_addr)
            .map_err(|detail| Error::InitBrokerAddress {
                address: broker_addr.to_string(),
                detail,
            })?;

        for (key, value) in self.config.client_properties() {
            conf.set_property(key, &value)
                .map_err(|detail| Error::InvalidProperty {
                    key: key.to_string(),
                    detail,
                })?;
        }

        if let Some(sink) = sink {
            conf.set_delivery_sink(sink)
                .map_err(Error::InitDeliveryCallback)?;
            debug!(component = COMPONENT, "Delivery report callback registered");
        }
        self.state = ProducerState::Configured;

        let client = conf.create().map_err(Error::CreateProducer)?;
        self.client = Some(client);
        self.state = ProducerState::Ready;

        info!(
            component = COMPONENT,
            brokers = %self.config.brokers,
            partition = ?self.config.partition,
            "Producer ready"
        );
        Ok(())
    }

    /// Flushes, drains and tears the producer down.
    ///
    /// Safe to call any number of times and from any state; calls after the
    /// first are no-ops. Never fails: flush errors, drain timeouts and slow
    /// client shutdowns are logged and reported in the returned summary.
    pub fn close(&mut self) -> ShutdownReport {
        if self.state == ProducerState::Closed {
            debug!(component = COMPONENT, "Producer already closed");
            return ShutdownReport {
                already_closed: true,
                client_stopped: true,
                ..ShutdownReport::default()
            };
        }

        let timeouts = self.config.timeouts.clone();
        let mut report = ShutdownReport {
            client_stopped: true,
            ..ShutdownReport::default()
        };

        let client = self.client.take();
        if let Some(client) = &client {
            match client.flush(timeouts.flush()) {
                Ok(()) => report.flushed = true,
                Err(e) => warn!(component = COMPONENT, error = %e, "Flush did not complete"),
            }

            let (polls, abandoned) = drain(client, &timeouts);
            report.drain_polls = polls;
            report.abandoned = abandoned;
        }

        // Configuration is released before the handle
        self.conf = None;
        if let Some(client) = client {
            report.client_stopped = client.shutdown(timeouts.shutdown());
        }
        self.state = ProducerState::Closed;

        info!(
            component = COMPONENT,
            flushed = report.flushed,
            drain_polls = report.drain_polls,
            abandoned = report.abandoned,
            client_stopped = report.client_stopped,
            "Producer closed"
        );
        report
    }
}

/// Polls until nothing is outstanding or the drain budget is spent.
///
/// Returns the number of polls performed and the messages left behind.
fn drain<B: BrokerClient>(client: &B, timeouts: &TimeoutConfig) -> (usize, usize) {
    let started = Instant::now();
    let mut polls = 0;

    loop {
        let outstanding = client.outstanding_count();
        if outstanding == 0 {
            return (polls, 0);
        }
        if started.elapsed() >= timeouts.drain() {
            error!(
                component = COMPONENT,
                outstanding,
                drain_ms = timeouts.drain_ms,
                "Drain budget exhausted, abandoning outstanding messages"
            );
            return (polls, outstanding);
        }

        warn!(component = COMPONENT, outstanding, "Waiting for outstanding messages");
        client.poll_once(timeouts.poll());
        polls += 1;
    }
}
