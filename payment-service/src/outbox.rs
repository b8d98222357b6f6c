use crate::store::PaymentStore;
use anyhow::Result;
use messaging::EventPublisher;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

const DRAIN_INTERVAL: Duration = Duration::from_secs(5);
const DRAIN_BATCH: i64 = 100;

pub struct OutboxProcessor {
    store: Arc<dyn PaymentStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl OutboxProcessor {
    pub fn new(store: Arc<dyn PaymentStore>, publisher: Arc<dyn EventPublisher>) -> Self {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{PaymentCommands, ProcessPayment};
    use crate::store::MemoryPaymentStore;
    use contracts::MessageKind;
    use messaging::InMemoryBus;
    use uuid::Uuid;

    #[tokio::test]
    async fn drain_publishes_once_and_marks_processed() {
        let store = Arc::new(MemoryPaymentStore::new());
        let commands =
            PaymentCommands::with_gateway_delay(store.clone(), Duration::from_millis(0));
        commands
            .process_payment(ProcessPayment {
                booking_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                amount: "250.00".parse().unwrap(),
                currency: "USD".to_string(),
                payment_method: "PayPal".to_string(),
            })
            .await
            .unwrap();

        let bus = InMemoryBus::new();
        let processor = OutboxProcessor::new(store.clone(), bus.clone());

        assert_eq!(processor.drain().await.unwrap(), 1);
        assert_eq!(bus.published_of_kind(MessageKind::PaymentProcessed).len(), 1);

        // A second drain finds nothing pending.
        assert_eq!(processor.drain().await.unwrap(), 0);
        assert_eq!(bus.published().len(), 1);
    }
}
