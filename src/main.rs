use anyhow::{bail, Context};
use base64::Engine;
use chrono::{DateTime, Utc};
use clap::Parser;
use mq_producer::{
    DeliveryReport, DeliveryStatus, JsonSerializer, Producer, ProducerConfig, SharedSink,
};
use serde::Serialize;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "mq-producer")]
#[command(about = "Publish newline-delimited messages from stdin to a Kafka topic", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Bootstrap brokers, overrides the config file")]
    brokers: Option<String>,

    #[arg(short, long, help = "Destination topic")]
    topic: Option<String>,

    #[arg(long, default_value = "", help = "Value of the 'type' header")]
    type_tag: String,

    #[arg(short, long, help = "Target partition (default: partitioner decides)")]
    partition: Option<i32>,

    #[arg(long, help = "Input lines are base64 encoded binary payloads")]
    base64: bool,

    #[arg(long, help = "Wrap each line in a JSON envelope before sending")]
    envelope: bool,

    #[arg(long, help = "Probe the brokers and exit")]
    check: bool,

    #[arg(long, help = "List broker topics and exit")]
    list_topics: bool,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

/// Structured form of one input line when `--envelope` is set.
#[derive(Debug, Serialize)]
struct LineEnvelope<'a> {
    seq: u64,
    body: &'a str,
    captured_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PublishSummary {
    sent: u64,
    failed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    let config = load_config(&args)?;
    info!(
        brokers = %config.brokers,
        partition = ?config.partition,
        drain_ms = config.timeouts.drain_ms,
        "Configuration summary"
    );

    let brokers = config.brokers.clone();
    let mut producer = Producer::new(config);
    producer
        .init(&brokers, Some(delivery_logger()))
        .with_context(|| format!("failed to initialize producer for '{}'", brokers))?;

    if args.check {
        producer.require_connection()?;
        info!("Broker connection OK");
        producer.close();
        return Ok(());
    }
    if args.list_topics {
        for topic in producer.list_broker_topics() {
            println!("{}", topic);
        }
        producer.close();
        return Ok(());
    }

    let Some(topic) = args.topic.clone() else {
        bail!("--topic is required unless --check or --list-topics is given");
    };

    let (tx, rx) = mpsc::channel::<Vec<u8>>(1024);
    let type_tag = args.type_tag.clone();
    let publisher =
        tokio::task::spawn_blocking(move || publish_all(producer, rx, &topic, &type_tag));

    let mut lines = spawn_line_reader(BufReader::new(io::stdin()))?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut seq = 0u64;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    debug!("End of input");
                    break;
                };
                let line = line.context("failed to read stdin")?;
                if line.is_empty() {
                    continue;
                }
                let payload = match encode_line(&args, seq, &line) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Skipping line {}: {:#}", seq, e);
                        seq += 1;
                        continue;
                    }
                };
                seq += 1;
                if tx.send(payload).await.is_err() {
                    error!("Publisher stopped unexpectedly");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupt received, closing producer");
                break;
            }
        }
    }
    drop(tx);

    let summary = publisher.await.context("publisher task panicked")?;
    info!(sent = summary.sent, failed = summary.failed, "Done");
    if summary.failed > 0 {
        bail!("{} of {} messages failed", summary.failed, summary.sent + summary.failed);
    }
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<ProducerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ProducerConfig::from_file(path)?
        }
        None => ProducerConfig::new(String::new()),
    };

    if let Some(brokers) = &args.brokers {
        config.brokers = brokers.clone();
    }
    if let Some(partition) = args.partition {
        config.partition = Some(partition);
    }
    if config.brokers.trim().is_empty() {
        bail!("no brokers configured; pass --brokers or set 'brokers' in the config file");
    }
    Ok(config)
}

/// Reads lines on a plain OS thread and forwards them to the runtime.
///
/// A read blocked on an open terminal or pipe cannot be cancelled. Kept off
/// the runtime's blocking pool, it never holds up shutdown after Ctrl-C.
fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1024);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn encode_line(args: &Args, seq: u64, line: &str) -> anyhow::Result<Vec<u8>> {
    if args.base64 {
        return base64::engine::general_purpose::STANDARD
            .decode(line.trim())
            .context("invalid base64");
    }
    if args.envelope {
        let envelope = LineEnvelope {
            seq,
            body: line,
            captured_at: Utc::now(),
        };
        return Ok(JsonSerializer::default().serialize(&envelope)?);
    }
    Ok(line.as_bytes().to_vec())
}

fn publish_all(
    mut producer: Producer,
    mut rx: mpsc::Receiver<Vec<u8>>,
    topic: &str,
    type_tag: &str,
) -> PublishSummary {
    let mut summary = PublishSummary::default();

    while let Some(payload) = rx.blocking_recv() {
        match producer.produce(&payload, topic, type_tag) {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                // Already logged by the producer
                debug!(code = %e.code(), "Message not enqueued");
                summary.failed += 1;
            }
        }
    }

    let report = producer.close();
    if !report.is_clean() {
        warn!(
            abandoned = report.abandoned,
            client_stopped = report.client_stopped,
            "Producer did not shut down cleanly"
        );
    }
    summary
}

fn delivery_logger() -> SharedSink {
    Arc::new(|report: &DeliveryReport| match &report.status {
        DeliveryStatus::Delivered => debug!(
            topic = %report.topic,
            partition = report.partition,
            offset = report.offset,
            bytes = report.payload_len,
            "Message delivered"
        ),
        DeliveryStatus::Failed { error } => error!(
            topic = %report.topic,
            bytes = report.payload_len,
            error = %error,
            "Message delivery failed"
        ),
    })
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("mq_producer=debug,librdkafka=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mq_producer=info,librdkafka=warn,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::time::{Duration, Instant};

    /// Never returns, like a read on an idle terminal.
    struct StalledReader;

    impl Read for StalledReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    #[tokio::test]
    async fn test_line_reader_forwards_lines_until_eof() {
        let mut lines = spawn_line_reader(Cursor::new("first\nsecond\n")).unwrap();

        assert_eq!(lines.recv().await.unwrap().unwrap(), "first");
        assert_eq!(lines.recv().await.unwrap().unwrap(), "second");
        assert!(lines.recv().await.is_none());
    }

    #[test]
    fn test_stalled_input_does_not_block_runtime_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        let received = runtime.block_on(async {
            let mut lines = spawn_line_reader(BufReader::new(StalledReader)).unwrap();
            tokio::time::timeout(Duration::from_millis(50), lines.recv()).await
        });
        assert!(received.is_err());

        // The reader thread is still parked inside read()
        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
