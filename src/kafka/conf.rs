use rdkafka::producer::BaseProducer;
use rdkafka::ClientConfig;
use tracing::debug;

use crate::client::ClientConf;
use crate::delivery::SharedSink;
use crate::kafka::client::KafkaClient;
use crate::kafka::context::DeliveryContext;

/// librdkafka configuration for a [`KafkaClient`].
pub struct KafkaConf {
    config: ClientConfig,
    sink: Option<SharedSink>,
}

impl KafkaConf {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new(),
            sink: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key)
    }

    pub fn has_delivery_sink(&self) -> bool {
        self.sink.is_some()
    }
}

impl Default for KafkaConf {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConf for KafkaConf {
    type Client = KafkaClient;

    fn set_bootstrap_servers(&mut self, brokers: &str) -> Result<(), String> {
        validate_broker_list(brokers)?;
        self.set_property("bootstrap.servers", brokers)
    }

    fn set_property(&mut self, key: &str, value: &str) -> Result<(), String> {
        // librdkafka only checks properties when the native config is
        // built, so probe this one in isolation first.
        ClientConfig::new()
            .set(key, value)
            .create_native_config()
            .map_err(|e| e.to_string())?;

        debug!("Setting client property {}={}", key, value);
        self.config.set(key, value);
        Ok(())
    }

    fn set_delivery_sink(&mut self, sink: SharedSink) -> Result<(), String> {
        if self.sink.is_some() {
            return Err("a delivery report callback is already registered".to_string());
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn create(&self) -> Result<KafkaClient, String> {
        let producer: BaseProducer<DeliveryContext> = self
            .config
            .create_with_context(DeliveryContext::new(self.sink.clone()))
            .map_err(|e| e.to_string())?;

        Ok(KafkaClient::new(producer))
    }
}

/// Checks a comma separated `host[:port]` bootstrap list.
///
/// Entries may carry a `SCHEME://` prefix and bracketed IPv6 hosts.
pub fn validate_broker_list(brokers: &str) -> Result<(), String> {
    if brokers.trim().is_empty() {
        return Err("broker address is empty".to_string());
    }

    for entry in brokers.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(format!("empty entry in broker list '{}'", brokers));
        }
        if entry.chars().any(char::is_whitespace) {
            return Err(format!("whitespace in broker entry '{}'", entry));
        }

        let address = entry.split_once("://").map_or(entry, |(_, rest)| rest);
        let (host, port) = split_host_port(address)
            .ok_or_else(|| format!("malformed broker entry '{}'", entry))?;

        if host.is_empty() {
            return Err(format!("missing host in broker entry '{}'", entry));
        }
        if let Some(port) = port {
            match port.parse::<u16>() {
                Ok(0) | Err(_) => {
                    return Err(format!("invalid port '{}' in broker entry '{}'", port, entry))
                }
                Ok(_) => {}
            }
        }
    }

    Ok(())
}

fn split_host_port(address: &str) -> Option<(&str, Option<&str>)> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        return match tail {
            "" => Some((host, None)),
            _ => tail.strip_prefix(':').map(|port| (host, Some(port))),
        };
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Some((host, Some(port))),
        // Bare IPv6 literal without brackets
        Some(_) => None,
        None => Some((address, None)),
    }
}
