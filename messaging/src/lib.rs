mod dispatch;
mod kafka;
mod memory;

pub use dispatch::{DispatchOutcome, Dispatcher, HandlerError, MessageHandler};
pub use kafka::{run_consumer, KafkaPublisher};
pub use memory::{DeadLetter, InMemoryBus};

use async_trait::async_trait;
use contracts::Envelope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport publish failed: {0}")]
    Transport(String),
}

/// Hands one envelope to the bus for delivery to every interested
/// subscriber. Fire-and-forget from the producer's perspective: publish is
/// attempted once per call, it does not block on any consumer, and a
/// failure never rolls back state the caller already persisted.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &Envelope) -> Result<(), PublishError>;
}
