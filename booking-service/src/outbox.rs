use crate::store::BookingStore;
use anyhow::Result;
use messaging::EventPublisher;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

const DRAIN_INTERVAL: Duration = Duration::from_secs(5);
const DRAIN_BATCH: usize = 100;

/// Drains pending outbox records to the bus. A record is marked processed
/// only after a successful publish, so a crash or transport failure between
/// persist and publish re-attempts the announcement instead of losing it.
pub struct OutboxProcessor {
    store: Arc<dyn BookingStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl OutboxProcessor {
    pub fn new(store: Arc<dyn BookingStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(DRAIN_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = self.drain().await {
                error!("Error processing outbox records: {}", e);
            }
        }
    }

    pub async fn drain(&self) -> Result<usize> {
        let records = self.store.pending_outbox(DRAIN_BATCH).await?;
        let mut published = 0;

        for record in records {
            if let Err(e) = self.publisher.publish(&record.envelope).await {
                error!("Failed to publish outbox record {}: {}", record.id, e);
                continue;
            }
            self.store.mark_outbox_processed(record.id).await?;
            info!(record_id = %record.id, "published outbox record");
            published += 1;
        }

        Ok(published)
    }
}
