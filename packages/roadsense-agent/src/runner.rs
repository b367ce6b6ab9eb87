// Publish loop tying the batch reader to the publisher

use crate::datasource::CyclicBatchReader;
use crate::error::AgentResult;
use crate::publisher::OrderedPublisher;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct AgentRunner {
    reader: CyclicBatchReader,
    publisher: OrderedPublisher,
    delay: Duration,
}

impl AgentRunner {
    pub fn new(reader: CyclicBatchReader, publisher: OrderedPublisher, delay: Duration) -> Self {
        Self {
            reader,
            publisher,
            delay,
        }
    }

    /// Load the sources and publish batches until `cancel` fires.
    ///
    /// Cancellation is only observed between batches. Returns the number of
    /// batches published.
    pub async fn run(&mut self, cancel: CancellationToken) -> AgentResult<u64> {
        self.reader.load()?;
        tracing::info!("Publishing every {:?}", self.delay);

        let result = self.publish_until_cancelled(&cancel).await;
        self.reader.unload();

        if let Ok(batches) = &result {
            tracing::info!("Publish loop stopped after {} batches", batches);
        }
        result
    }

    async fn publish_until_cancelled(&mut self, cancel: &CancellationToken) -> AgentResult<u64> {
        let mut batches = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(batches),
                _ = tokio::time::sleep(self.delay) => {}
            }

            let batch = self.reader.next_batch()?;
            let report = self.publisher.publish_batch(&batch).await;
            batches += 1;
            tracing::debug!(
                "Batch {}: {} records, {} messages sent",
                batches,
                batch.len(),
                report.sent
            );
        }
    }
}
