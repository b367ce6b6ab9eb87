// Ordered multi-topic publisher
//
// Each record is split into its accelerometer, gps and parking payloads,
// which are sent in that order before moving on to the next record.

use crate::error::AgentResult;
use crate::types::AggregatedRecord;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Message bus the publisher sends through
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one payload. `Err` carries the failure status of this send only.
    async fn publish(&self, topic: &str, payload: String) -> AgentResult<()>;
}

/// Destination topic for each reading kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub accelerometer: String,
    pub gps: String,
    pub parking: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            accelerometer: "agent_accelerometer_topic".to_string(),
            gps: "agent_gps_topic".to_string(),
            parking: "agent_parking_topic".to_string(),
        }
    }
}

/// Outcome of publishing one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct OrderedPublisher {
    transport: Arc<dyn Transport>,
    topics: Topics,
}

impl OrderedPublisher {
    pub fn new(transport: Arc<dyn Transport>, topics: Topics) -> Self {
        Self { transport, topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Publish every record of the batch in order.
    ///
    /// Failed sends are logged and skipped; there is no retry.
    pub async fn publish_batch(&self, records: &[AggregatedRecord]) -> PublishReport {
        let mut report = PublishReport::default();

        for record in records {
            self.send(&self.topics.accelerometer, &record.accelerometer, &mut report)
                .await;
            self.send(&self.topics.gps, &record.gps, &mut report).await;
            self.send(&self.topics.parking, &record.parking, &mut report)
                .await;
        }

        if report.failed > 0 {
            tracing::warn!(
                "Published batch of {} records: {} sent, {} failed",
                records.len(),
                report.sent,
                report.failed
            );
        } else {
            tracing::debug!("Published batch of {} records", records.len());
        }
        report
    }

    async fn send<T: Serialize>(&self, topic: &str, reading: &T, report: &mut PublishReport) {
        let payload = match serde_json::to_string(reading) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize payload for topic {}: {}", topic, e);
                report.failed += 1;
                return;
            }
        };

        match self.transport.publish(topic, payload).await {
            Ok(()) => {
                tracing::debug!("Sent message to topic {}", topic);
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to send message to topic {}: {}", topic, e);
                report.failed += 1;
            }
        }
    }
}
