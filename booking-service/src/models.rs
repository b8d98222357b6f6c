use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Owned exclusively by this service's store. Status starts at Pending at
/// creation; everything after Pending is driven by consumed events, never
/// by the create path itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub passenger_phone: String,
    pub number_of_seats: i32,
    pub total_amount: BigDecimal,
    pub status: BookingStatus,
    pub booking_date: DateTime<Utc>,
    pub confirmation_date: Option<DateTime<Utc>>,
    pub booking_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    PaymentPending,
    PaymentCompleted,
    PaymentFailed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::PaymentPending => "PaymentPending",
            BookingStatus::PaymentCompleted => "PaymentCompleted",
            BookingStatus::PaymentFailed => "PaymentFailed",
        };
        f.write_str(name)
    }
}
