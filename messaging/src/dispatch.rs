use async_trait::async_trait;
use contracts::{Envelope, MessageKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The delivery can never succeed (e.g. an enumeration string that does
    /// not parse). Routed to the dead-letter topic instead of redelivery.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Transient failure; the transport may redeliver.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Per-event business logic. A handler performs a local state transition
/// using only the data in the envelope and must tolerate being invoked more
/// than once for the same logical message (at-least-once delivery).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError>;
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Handled(MessageKind),
    /// No handler registered for this kind. Topics are shared, so traffic
    /// another service cares about simply passes through.
    Ignored(MessageKind),
    /// Undecodable payload or a rejected delivery; carries the reason.
    DeadLetter(String),
    /// Handler failed transiently; the message must not be committed.
    Retry(MessageKind, String),
}

/// Routes each incoming message to the single handler registered for its
/// contract type with a deserialized, strongly-typed payload.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<MessageKind, Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: MessageKind, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub async fn dispatch(&self, raw: &[u8]) -> DispatchOutcome {
        let envelope: Envelope = match serde_json::from_slice(raw) {
            Ok(envelope) => envelope,
            Err(e) => return DispatchOutcome::DeadLetter(format!("undecodable envelope: {}", e)),
        };

        let kind = envelope.kind();
        let handler = match self.handlers.get(&kind) {
            Some(handler) => handler,
            None => return DispatchOutcome::Ignored(kind),
        };

        match handler.handle(&envelope).await {
            Ok(()) => DispatchOutcome::Handled(kind),
            Err(HandlerError::Rejected(reason)) => {
                DispatchOutcome::DeadLetter(format!("{}: {}", kind, reason))
            }
            Err(HandlerError::Failed(e)) => DispatchOutcome::Retry(kind, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FlightSeatsUpdated, Message};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct Recording {
        seen: Mutex<Vec<Envelope>>,
        result: fn() -> Result<(), HandlerError>,
    }

    #[async_trait]
    impl MessageHandler for Recording {
        async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(envelope.clone());
            (self.result)()
        }
    }

    fn seats_envelope() -> Envelope {
        Envelope::new(Message::FlightSeatsUpdated(FlightSeatsUpdated {
            flight_id: Uuid::new_v4(),
            available_seats: 12,
            updated_at: chrono::Utc::now(),
        }))
    }

    #[tokio::test]
    async fn routes_to_exactly_one_handler_by_kind() {
        let handler = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            result: || Ok(()),
        });
        let dispatcher =
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, handler.clone());

        let raw = serde_json::to_vec(&seats_envelope()).unwrap();
        let outcome = dispatcher.dispatch(&raw).await;

        assert!(matches!(outcome, DispatchOutcome::Handled(MessageKind::FlightSeatsUpdated)));
        assert_eq!(handler.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unregistered_kind_is_ignored() {
        let dispatcher = Dispatcher::new();
        let raw = serde_json::to_vec(&seats_envelope()).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&raw).await,
            DispatchOutcome::Ignored(MessageKind::FlightSeatsUpdated)
        ));
    }

    #[tokio::test]
    async fn undecodable_payload_goes_to_dead_letter() {
        let dispatcher = Dispatcher::new();
        assert!(matches!(
            dispatcher.dispatch(b"{not json").await,
            DispatchOutcome::DeadLetter(_)
        ));
    }

    #[tokio::test]
    async fn rejected_delivery_goes_to_dead_letter() {
        let handler = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            result: || Err(HandlerError::Rejected("bad payload".to_string())),
        });
        let dispatcher =
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, handler);

        let raw = serde_json::to_vec(&seats_envelope()).unwrap();
        assert!(matches!(dispatcher.dispatch(&raw).await, DispatchOutcome::DeadLetter(_)));
    }

    #[tokio::test]
    async fn transient_failure_asks_for_redelivery() {
        let handler = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            result: || Err(HandlerError::Failed(anyhow::anyhow!("store unavailable"))),
        });
        let dispatcher =
            Dispatcher::new().register(MessageKind::FlightSeatsUpdated, handler);

        let raw = serde_json::to_vec(&seats_envelope()).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&raw).await,
            DispatchOutcome::Retry(MessageKind::FlightSeatsUpdated, _)
        ));
    }
}
