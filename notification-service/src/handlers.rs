use crate::channel::NotificationChannel;
use crate::models::{Notification, NotificationStatus};
use crate::store::NotificationStore;
use async_trait::async_trait;
use chrono::Utc;
use contracts::{Envelope, Message, NotificationType};
use messaging::{HandlerError, MessageHandler};
use std::sync::Arc;
use tracing::{info, warn};

/// The PaymentProcessed contract carries no recipient address; this is the
/// placeholder the delivery falls back to until the contract is enriched.
const PLACEHOLDER_RECIPIENT: &str = "user@example.com";

/// Shared per-delivery state machine:
/// upsert Pending -> channel send -> persist Sent.
///
/// The upsert keys on the envelope dedup key, so a redelivered message
/// finds the existing notification; if it is already Sent the whole
/// delivery is a no-op. A channel failure surfaces as retryable and leaves
/// the notification Pending.
async fn deliver(
    store: &Arc<dyn NotificationStore>,
    channel: &Arc<dyn NotificationChannel>,
    notification: Notification,
) -> Result<(), HandlerError> {
    let mut stored = store.upsert_by_dedup_key(notification).await?;

    if stored.status == NotificationStatus::Sent {
        info!(notification_id = %stored.id, "already sent, skipping redelivery");
        return Ok(());
    }

    channel
        .send(&stored.recipient, &stored.subject, &stored.message)
        .await?;

    stored.status = NotificationStatus::Sent;
    stored.sent_at = Some(Utc::now());
    stored.updated_at = Some(Utc::now());
    store.update(stored).await?;

    Ok(())
}

pub struct BookingCreatedHandler {
    store: Arc<dyn NotificationStore>,
    channel: Arc<dyn NotificationChannel>,
}

impl BookingCreatedHandler {
    pub fn new(store: Arc<dyn NotificationStore>, channel: Arc<dyn NotificationChannel>) -> Self {
        Self { store, channel }
    }
}

#[async_trait]
impl MessageHandler for BookingCreatedHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let event = match &envelope.payload {
            Message::BookingCreated(event) => event,
            other => {
                warn!(kind = %other.kind(), "unexpected message kind");
                return Err(HandlerError::Rejected("unexpected message kind".to_string()));
            }
        };

        let notification = Notification::pending(
            event.user_id,
            Some(event.booking_id),
            NotificationType::Email,
            "Booking Confirmation".to_string(),
            format!(
                "Your booking for flight {} has been created successfully. Booking Reference: {}",
                event.flight_id, event.booking_id
            ),
            event.passenger_email.clone(),
            envelope.dedup_key.clone(),
        );

        deliver(&self.store, &self.channel, notification).await
    }
}

pub struct PaymentProcessedHandler {
    store: Arc<dyn NotificationStore>,
    channel: Arc<dyn NotificationChannel>,
}

impl PaymentProcessedHandler {
    pub fn new(store: Arc<dyn NotificationStore>, channel: Arc<dyn NotificationChannel>) -> Self {
        Self { store, channel }
    }
}

#[async_trait]
impl MessageHandler for PaymentProcessedHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let event = match &envelope.payload {
            Message::PaymentProcessed(event) => event,
            other => {
                warn!(kind = %other.kind(), "unexpected message kind");
                return Err(HandlerError::Rejected("unexpected message kind".to_string()));
            }
        };

        let notification = Notification::pending(
            event.user_id,
            Some(event.booking_id),
            NotificationType::Email,
            "Payment Confirmation".to_string(),
            format!(
                "Your payment of {} has been {}. Transaction ID: {}",
                event.amount,
                event.payment_status,
                event.transaction_id.as_deref().unwrap_or("")
            ),
            PLACEHOLDER_RECIPIENT.to_string(),
            envelope.dedup_key.clone(),
        );

        deliver(&self.store, &self.channel, notification).await
    }
}

pub struct SendNotificationHandler {
    store: Arc<dyn NotificationStore>,
    channel: Arc<dyn NotificationChannel>,
}

impl SendNotificationHandler {
    pub fn new(store: Arc<dyn NotificationStore>, channel: Arc<dyn NotificationChannel>) -> Self {
        Self { store, channel }
    }
}

#[async_trait]
impl MessageHandler for SendNotificationHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let command = match &envelope.payload {
            Message::SendNotification(command) => command,
            other => {
                warn!(kind = %other.kind(), "unexpected message kind");
                return Err(HandlerError::Rejected("unexpected message kind".to_string()));
            }
        };

        // Parse before touching the store: an unknown type can never
        // succeed, so it goes to the dead-letter path with nothing persisted.
        let notification_type: NotificationType = command
            .notification_type
            .parse()
            .map_err(|e: contracts::ContractError| HandlerError::Rejected(e.to_string()))?;

        let notification = Notification::pending(
            command.user_id,
            command.booking_id,
            notification_type,
            command.subject.clone(),
            command.message.clone(),
            command.recipient.clone(),
            envelope.dedup_key.clone(),
        );

        deliver(&self.store, &self.channel, notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNotificationStore;
    use anyhow::anyhow;
    use bigdecimal::BigDecimal;
    use contracts::{BookingCreated, PaymentProcessed, SendNotification};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct InstantChannel;

    #[async_trait]
    impl NotificationChannel for InstantChannel {
        async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            Err(anyhow!("provider unavailable"))
        }
    }

    /// Observes the store's pending set at the moment of dispatch, to pin
    /// down the Pending-before-Sent ordering.
    struct ProbingChannel {
        store: Arc<MemoryNotificationStore>,
        pending_at_send: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl NotificationChannel for ProbingChannel {
        async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            let pending = self.store.get_pending().await?;
            self.pending_at_send.lock().unwrap().push(pending.len());
            Ok(())
        }
    }

    fn booking_envelope() -> Envelope {
        Envelope::new(Message::BookingCreated(BookingCreated {
            booking_id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            passenger_name: "Jane Doe".to_string(),
            passenger_email: "jane@example.com".to_string(),
            number_of_seats: 2,
            total_amount: "500.00".parse::<BigDecimal>().unwrap(),
            booking_date: Utc::now(),
        }))
    }

    fn payment_envelope() -> Envelope {
        Envelope::new(Message::PaymentProcessed(PaymentProcessed {
            payment_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: "500.00".parse::<BigDecimal>().unwrap(),
            payment_status: "Completed".to_string(),
            transaction_id: Some("TXN2024010112000012345".to_string()),
            payment_date: Utc::now(),
        }))
    }

    fn send_envelope(notification_type: &str) -> Envelope {
        Envelope::new(Message::SendNotification(SendNotification {
            user_id: Uuid::new_v4(),
            booking_id: Some(Uuid::new_v4()),
            notification_type: notification_type.to_string(),
            subject: "Gate change".to_string(),
            message: "Your flight now departs from gate B7.".to_string(),
            recipient: "jane@example.com".to_string(),
        }))
    }

    #[tokio::test]
    async fn booking_created_produces_one_sent_notification() {
        let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
        let handler = BookingCreatedHandler::new(store.clone(), Arc::new(InstantChannel));

        let envelope = booking_envelope();
        let (booking_id, email, flight_id) = match &envelope.payload {
            Message::BookingCreated(e) => (e.booking_id, e.passenger_email.clone(), e.flight_id),
            _ => unreachable!(),
        };

        handler.handle(&envelope).await.unwrap();

        let notifications = store.get_by_booking(booking_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        let notification = &notifications[0];
        assert_eq!(notification.status, NotificationStatus::Sent);
        assert_eq!(notification.recipient, email);
        assert_eq!(notification.subject, "Booking Confirmation");
        assert_eq!(notification.notification_type, NotificationType::Email);
        assert!(notification.message.contains(&flight_id.to_string()));
        assert!(notification.message.contains(&booking_id.to_string()));
        assert!(notification.sent_at.is_some());
    }

    #[tokio::test]
    async fn notification_is_pending_during_dispatch_then_sent() {
        let store = Arc::new(MemoryNotificationStore::new());
        let probe = Arc::new(ProbingChannel {
            store: store.clone(),
            pending_at_send: Mutex::new(Vec::new()),
        });
        let handler = BookingCreatedHandler::new(store.clone(), probe.clone());

        handler.handle(&booking_envelope()).await.unwrap();

        // Exactly one Pending notification existed while the channel ran,
        // and none remain after.
        assert_eq!(*probe.pending_at_send.lock().unwrap(), vec![1]);
        assert!(store.get_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn redelivered_booking_created_yields_exactly_one_notification() {
        let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
        let handler = BookingCreatedHandler::new(store.clone(), Arc::new(InstantChannel));

        let envelope = booking_envelope();
        let booking_id = match &envelope.payload {
            Message::BookingCreated(e) => e.booking_id,
            _ => unreachable!(),
        };

        handler.handle(&envelope).await.unwrap();
        handler.handle(&envelope).await.unwrap();

        let notifications = store.get_by_booking(booking_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].status, NotificationStatus::Sent);
    }

    #[tokio::test]
    async fn payment_processed_uses_the_payment_template() {
        let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
        let handler = PaymentProcessedHandler::new(store.clone(), Arc::new(InstantChannel));

        let envelope = payment_envelope();
        let (booking_id, user_id) = match &envelope.payload {
            Message::PaymentProcessed(e) => (e.booking_id, e.user_id),
            _ => unreachable!(),
        };

        handler.handle(&envelope).await.unwrap();

        let notifications = store.get_by_user(user_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        let notification = &notifications[0];
        assert_eq!(notification.subject, "Payment Confirmation");
        assert_eq!(notification.booking_id, Some(booking_id));
        assert_eq!(notification.recipient, PLACEHOLDER_RECIPIENT);
        assert!(notification.message.contains("500.00"));
        assert!(notification.message.contains("Completed"));
        assert!(notification.message.contains("TXN2024010112000012345"));
    }

    #[tokio::test]
    async fn send_notification_accepts_known_types_in_any_case() {
        for (raw, expected) in [
            ("Email", NotificationType::Email),
            ("SMS", NotificationType::Sms),
            ("sms", NotificationType::Sms),
            ("PUSH", NotificationType::Push),
            ("inapp", NotificationType::InApp),
        ] {
            let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
            let handler = SendNotificationHandler::new(store.clone(), Arc::new(InstantChannel));

            let envelope = send_envelope(raw);
            let user_id = match &envelope.payload {
                Message::SendNotification(c) => c.user_id,
                _ => unreachable!(),
            };

            handler.handle(&envelope).await.unwrap();

            let notifications = store.get_by_user(user_id).await.unwrap();
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].notification_type, expected);
            assert_eq!(notifications[0].status, NotificationStatus::Sent);
        }
    }

    #[tokio::test]
    async fn unknown_notification_type_is_rejected_and_store_unchanged() {
        let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
        let handler = SendNotificationHandler::new(store.clone(), Arc::new(InstantChannel));

        let envelope = send_envelope("carrier-pigeon");
        let user_id = match &envelope.payload {
            Message::SendNotification(c) => c.user_id,
            _ => unreachable!(),
        };

        let result = handler.handle(&envelope).await;

        assert!(matches!(result, Err(HandlerError::Rejected(_))));
        assert!(store.get_by_user(user_id).await.unwrap().is_empty());
        assert!(store.get_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn channel_failure_is_retryable_and_leaves_notification_pending() {
        let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
        let handler = BookingCreatedHandler::new(store.clone(), Arc::new(FailingChannel));

        let envelope = booking_envelope();
        let booking_id = match &envelope.payload {
            Message::BookingCreated(e) => e.booking_id,
            _ => unreachable!(),
        };

        let result = handler.handle(&envelope).await;
        assert!(matches!(result, Err(HandlerError::Failed(_))));

        let notifications = store.get_by_booking(booking_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].status, NotificationStatus::Pending);

        // A later redelivery with a healthy channel completes the delivery
        // against the same identity.
        let retry = BookingCreatedHandler::new(store.clone(), Arc::new(InstantChannel));
        retry.handle(&envelope).await.unwrap();
        let notifications = store.get_by_booking(booking_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].status, NotificationStatus::Sent);
    }
}
