use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("unknown notification type: {0}")]
    UnknownNotificationType(String),
    #[error("unknown payment method: {0}")]
    UnknownPaymentMethod(String),
}

/// Published by the booking service after a booking is persisted with
/// status Pending. The field set is the complete payload; consumers must
/// not enrich it from any shared store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreated {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub number_of_seats: i32,
    pub total_amount: BigDecimal,
    pub booking_date: DateTime<Utc>,
}

/// Published by the payment service once a payment has reached a terminal
/// status. `payment_status` always reports that terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcessed {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSeatsUpdated {
    pub flight_id: Uuid,
    pub available_seats: i32,
    pub updated_at: DateTime<Utc>,
}

/// Ad-hoc dispatch command. `notification_type` is carried as a string on
/// the wire and parsed at the consumer boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendNotification {
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub notification_type: String,
    pub subject: String,
    pub message: String,
    pub recipient: String,
}

/// Closed set of messages exchanged on the bus. The tag travels with the
/// payload so a consumer can decode without out-of-band type metadata;
/// an unknown tag is a decode error, never a panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "booking-created")]
    BookingCreated(BookingCreated),
    #[serde(rename = "payment-processed")]
    PaymentProcessed(PaymentProcessed),
    #[serde(rename = "flight-seats-updated")]
    FlightSeatsUpdated(FlightSeatsUpdated),
    #[serde(rename = "send-notification")]
    SendNotification(SendNotification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    BookingCreated,
    PaymentProcessed,
    FlightSeatsUpdated,
    SendNotification,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::BookingCreated => "booking-created",
            MessageKind::PaymentProcessed => "payment-processed",
            MessageKind::FlightSeatsUpdated => "flight-seats-updated",
            MessageKind::SendNotification => "send-notification",
        };
        f.write_str(name)
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::BookingCreated(_) => MessageKind::BookingCreated,
            Message::PaymentProcessed(_) => MessageKind::PaymentProcessed,
            Message::FlightSeatsUpdated(_) => MessageKind::FlightSeatsUpdated,
            Message::SendNotification(_) => MessageKind::SendNotification,
        }
    }

    /// One named topic per contract type.
    pub fn topic(&self) -> &'static str {
        match self {
            Message::BookingCreated(_) => "booking-events",
            Message::PaymentProcessed(_) => "payment-events",
            Message::FlightSeatsUpdated(_) => "flight-events",
            Message::SendNotification(_) => "notification-commands",
        }
    }

    /// Deterministic (message type, correlation id) key. Computed once by
    /// the producer so a redelivered message carries the same key, which is
    /// what consumers deduplicate on. Commands have no natural correlation
    /// field, so they fall back to the producer-assigned envelope id.
    fn dedup_key(&self, envelope_id: Uuid) -> String {
        match self {
            Message::BookingCreated(e) => format!("{}:{}", self.kind(), e.booking_id),
            Message::PaymentProcessed(e) => format!("{}:{}", self.kind(), e.payment_id),
            Message::FlightSeatsUpdated(e) => {
                format!("{}:{}:{}", self.kind(), e.flight_id, e.updated_at.timestamp_millis())
            }
            Message::SendNotification(_) => format!("{}:{}", self.kind(), envelope_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub dedup_key: String,
    pub payload: Message,
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(payload: Message) -> Self {
        let id = Uuid::new_v4();
        let dedup_key = payload.dedup_key(id);
        Self {
            id,
            dedup_key,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn topic(&self) -> &'static str {
        self.payload.topic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Email,
    #[serde(rename = "SMS")]
    Sms,
    Push,
    InApp,
}

impl FromStr for NotificationType {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(NotificationType::Email),
            "sms" => Ok(NotificationType::Sms),
            "push" => Ok(NotificationType::Push),
            "inapp" => Ok(NotificationType::InApp),
            _ => Err(ContractError::UnknownNotificationType(s.to_string())),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationType::Email => "Email",
            NotificationType::Sms => "SMS",
            NotificationType::Push => "Push",
            NotificationType::InApp => "InApp",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    PayPal,
    BankTransfer,
    Wallet,
}

impl FromStr for PaymentMethod {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "creditcard" => Ok(PaymentMethod::CreditCard),
            "debitcard" => Ok(PaymentMethod::DebitCard),
            "paypal" => Ok(PaymentMethod::PayPal),
            "banktransfer" => Ok(PaymentMethod::BankTransfer),
            "wallet" => Ok(PaymentMethod::Wallet),
            _ => Err(ContractError::UnknownPaymentMethod(s.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::CreditCard => "CreditCard",
            PaymentMethod::DebitCard => "DebitCard",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::BankTransfer => "BankTransfer",
            PaymentMethod::Wallet => "Wallet",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking_created() -> BookingCreated {
        BookingCreated {
            booking_id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            passenger_name: "Jane Doe".to_string(),
            passenger_email: "jane@example.com".to_string(),
            number_of_seats: 2,
            total_amount: "500.00".parse().unwrap(),
            booking_date: Utc::now(),
        }
    }

    #[test]
    fn envelope_round_trips_with_type_tag() {
        let envelope = Envelope::new(Message::BookingCreated(booking_created()));
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""type":"booking-created""#));

        let decoded: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, envelope.id);
        assert_eq!(decoded.dedup_key, envelope.dedup_key);
        assert_eq!(decoded.kind(), MessageKind::BookingCreated);
    }

    #[test]
    fn unknown_type_tag_is_a_decode_error() {
        let json = r#"{"id":"6f95cb0c-6a4f-4dcb-9a16-18a01d3ac1b0",
                       "dedup_key":"x",
                       "payload":{"type":"seat-map-changed"},
                       "created_at":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Envelope>(json).is_err());
    }

    #[test]
    fn dedup_key_is_stable_per_correlation_id() {
        let event = booking_created();
        let a = Envelope::new(Message::BookingCreated(event.clone()));
        let b = Envelope::new(Message::BookingCreated(event.clone()));
        // Two publishes of the same logical event share the dedup key even
        // though the envelopes differ.
        assert_ne!(a.id, b.id);
        assert_eq!(a.dedup_key, b.dedup_key);
        assert_eq!(a.dedup_key, format!("booking-created:{}", event.booking_id));
    }

    #[test]
    fn command_dedup_key_uses_envelope_id() {
        let command = SendNotification {
            user_id: Uuid::new_v4(),
            booking_id: None,
            notification_type: "Email".to_string(),
            subject: "s".to_string(),
            message: "m".to_string(),
            recipient: "r@example.com".to_string(),
        };
        let envelope = Envelope::new(Message::SendNotification(command));
        assert_eq!(envelope.dedup_key, format!("send-notification:{}", envelope.id));
    }

    #[test]
    fn notification_type_parses_case_insensitively() {
        for (raw, expected) in [
            ("Email", NotificationType::Email),
            ("EMAIL", NotificationType::Email),
            ("sms", NotificationType::Sms),
            ("SMS", NotificationType::Sms),
            ("Push", NotificationType::Push),
            ("inapp", NotificationType::InApp),
            ("InApp", NotificationType::InApp),
        ] {
            assert_eq!(raw.parse::<NotificationType>().unwrap(), expected);
        }
        assert!("carrier-pigeon".parse::<NotificationType>().is_err());
    }

    #[test]
    fn payment_method_parses_case_insensitively() {
        assert_eq!("CreditCard".parse::<PaymentMethod>().unwrap(), PaymentMethod::CreditCard);
        assert_eq!("paypal".parse::<PaymentMethod>().unwrap(), PaymentMethod::PayPal);
        assert!("cash".parse::<PaymentMethod>().is_err());
    }
}
