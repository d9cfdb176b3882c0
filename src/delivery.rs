//! Delivery reports and the sink they are handed to.
//!
//! The broker client acknowledges every enqueued message asynchronously,
//! from inside `poll`, in an order unrelated to submission order. The
//! producer only registers the sink; the client invokes it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Final outcome of one previously enqueued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: i32,
    /// Broker offset, negative when the message was never written.
    pub offset: i64,
    pub payload_len: usize,
    /// Value of the `type` header the message was sent with.
    pub type_tag: Option<String>,
    #[serde(flatten)]
    pub status: DeliveryStatus,
    pub reported_at: DateTime<Utc>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

/// Receives delivery reports from the broker client's poll loop.
///
/// Implementations run on whichever thread calls `poll`, so they should
/// return quickly.
pub trait DeliveryReportSink: Send + Sync {
    fn on_delivery(&self, report: &DeliveryReport);
}

impl<F> DeliveryReportSink for F
where
    F: Fn(&DeliveryReport) + Send + Sync,
{
    fn on_delivery(&self, report: &DeliveryReport) {
        self(report)
    }
}

pub type SharedSink = Arc<dyn DeliveryReportSink>;
