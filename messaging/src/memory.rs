use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::{EventPublisher, PublishError};
use async_trait::async_trait;
use contracts::{Envelope, MessageKind};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub reason: String,
    pub raw: Vec<u8>,
}

/// Test transport. Publish appends to a log and delivers synchronously to
/// every subscribed dispatcher, which gives deterministic end-to-end runs
/// without a broker while keeping the same at-least-once handler contract.
#[derive(Default)]
pub struct InMemoryBus {
    published: Mutex<Vec<Envelope>>,
    dead_letters: Mutex<Vec<DeadLetter>>,
    retry_requests: Mutex<Vec<(MessageKind, String)>>,
    subscribers: RwLock<Vec<Arc<Dispatcher>>>,
}

impl InMemoryBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(&self, dispatcher: Dispatcher) {
        self.subscribers.write().unwrap().push(Arc::new(dispatcher));
    }

    pub fn published(&self) -> Vec<Envelope> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_of_kind(&self, kind: MessageKind) -> Vec<Envelope> {
        self.published()
            .into_iter()
            .filter(|envelope| envelope.kind() == kind)
            .collect()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().unwrap().clone()
    }

    pub fn retry_requests(&self) -> Vec<(MessageKind, String)> {
        self.retry_requests.lock().unwrap().clone()
    }

    /// Redeliver an already-published envelope to all subscribers, as a
    /// transport would after a timeout. Does not append to the publish log.
    pub async fn redeliver(&self, envelope: &Envelope) {
        let raw = serde_json::to_vec(envelope).expect("envelope encodes");
        self.deliver(&raw).await;
    }

    async fn deliver(&self, raw: &[u8]) {
        let subscribers: Vec<Arc<Dispatcher>> =
            self.subscribers.read().unwrap().iter().cloned().collect();

        for dispatcher in subscribers {
            match dispatcher.dispatch(raw).await {
                DispatchOutcome::Handled(_) | DispatchOutcome::Ignored(_) => {}
                DispatchOutcome::DeadLetter(reason) => {
                    self.dead_letters.lock().unwrap().push(DeadLetter {
                        reason,
                        raw: raw.to_vec(),
                    });
                }
                DispatchOutcome::Retry(kind, reason) => {
                    self.retry_requests.lock().unwrap().push((kind, reason));
                }
            }
        }
    }
}

#[async_trait]
impl EventPublisher for InMemoryBus {
    async fn publish(&self, envelope: &Envelope) -> Result<(), PublishError> {
        let raw = serde_json::to_vec(envelope)?;
        self.published.lock().unwrap().push(envelope.clone());
        self.deliver(&raw).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{HandlerError, MessageHandler};
    use contracts::{FlightSeatsUpdated, Message};
    use uuid::Uuid;

    struct Counting(Mutex<usize>);

    #[async_trait]
    impl MessageHandler for Counting {
        async fn handle(&self, _envelope: &Envelope) -> Result<(), HandlerError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn seats_envelope() -> Envelope {
        Envelope::new(Message::FlightSeatsUpdated(FlightSeatsUpdated {
            flight_id: Uuid::new_v4(),
            available_seats: 3,
            updated_at: chrono::Utc::now(),
        }))
    }

    #[tokio::test]
    async fn publish_records_and_delivers_to_subscribers() {
        let bus = InMemoryBus::new();
        let handler = Arc::new(Counting(Mutex::new(0)));
        bus.subscribe(
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, handler.clone()),
        );

        bus.publish(&seats_envelope()).await.unwrap();

        assert_eq!(bus.published().len(), 1);
        assert_eq!(*handler.0.lock().unwrap(), 1);
        assert!(bus.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn redelivery_reaches_handlers_without_growing_the_log() {
        let bus = InMemoryBus::new();
        let handler = Arc::new(Counting(Mutex::new(0)));
        bus.subscribe(
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, handler.clone()),
        );

        let envelope = seats_envelope();
        bus.publish(&envelope).await.unwrap();
        bus.redeliver(&envelope).await;

        assert_eq!(bus.published().len(), 1);
        assert_eq!(*handler.0.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn transient_handler_failures_are_recorded_as_retry_requests() {
        struct Failing;

        #[async_trait]
        impl MessageHandler for Failing {
            async fn handle(&self, _envelope: &Envelope) -> Result<(), HandlerError> {
                Err(HandlerError::Failed(anyhow::anyhow!("store unavailable")))
            }
        }

        let bus = InMemoryBus::new();
        bus.subscribe(
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, Arc::new(Failing)),
        );

        bus.publish(&seats_envelope()).await.unwrap();

        let retries = bus.retry_requests();
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].0, MessageKind::FlightSeatsUpdated);
        assert!(retries[0].1.contains("store unavailable"));
        assert!(bus.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn rejected_deliveries_are_collected_as_dead_letters() {
        struct Rejecting;

        #[async_trait]
        impl MessageHandler for Rejecting {
            async fn handle(&self, _envelope: &Envelope) -> Result<(), HandlerError> {
                Err(HandlerError::Rejected("unusable".to_string()))
            }
        }

        let bus = InMemoryBus::new();
        bus.subscribe(
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, Arc::new(Rejecting)),
        );

        bus.publish(&seats_envelope()).await.unwrap();

        assert_eq!(bus.dead_letters().len(), 1);
        assert!(bus.dead_letters()[0].reason.contains("unusable"));
    }
}
