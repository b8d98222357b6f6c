use crate::models::{Booking, BookingStatus};
use crate::store::BookingStore;
use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use contracts::{BookingCreated, Envelope, Message};
use messaging::{HandlerError, MessageHandler};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub passenger_phone: String,
    pub number_of_seats: i32,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub status: BookingStatus,
}

pub struct BookingCommands {
    store: Arc<dyn BookingStore>,
}

impl BookingCommands {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Persists the booking in Pending and enqueues the BookingCreated
    /// event in the same store operation. The outbox processor announces
    /// it; this handler never publishes directly and never retries.
    pub async fn create_booking(&self, command: CreateBooking) -> Result<CreateBookingResponse> {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            flight_id: command.flight_id,
            user_id: command.user_id,
            passenger_name: command.passenger_name,
            passenger_email: command.passenger_email,
            passenger_phone: command.passenger_phone,
            number_of_seats: command.number_of_seats,
            total_amount: command.total_amount,
            status: BookingStatus::Pending,
            booking_date: now,
            confirmation_date: None,
            booking_reference: Some(generate_booking_reference()),
            created_at: now,
            updated_at: None,
        };

        let event = BookingCreated {
            booking_id: booking.id,
            flight_id: booking.flight_id,
            user_id: booking.user_id,
            passenger_name: booking.passenger_name.clone(),
            passenger_email: booking.passenger_email.clone(),
            number_of_seats: booking.number_of_seats,
            total_amount: booking.total_amount.clone(),
            booking_date: booking.booking_date,
        };
        let envelope = Envelope::new(Message::BookingCreated(event));

        let response = CreateBookingResponse {
            booking_id: booking.id,
            booking_reference: booking
                .booking_reference
                .clone()
                .unwrap_or_default(),
            status: booking.status,
        };

        self.store.create_with_outbox(booking, envelope).await?;
        info!(booking_id = %response.booking_id, "booking created");

        Ok(response)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        self.store.get(id).await
    }

    pub async fn get_bookings_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        self.store.get_by_user(user_id).await
    }
}

fn generate_booking_reference() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("BK{}{}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

/// Reconciles booking status with the payment outcome. BookingCreated and
/// PaymentProcessed for one booking may arrive in either order; an event
/// for a booking this store has never seen is skipped, not retried.
pub struct PaymentProcessedHandler {
    store: Arc<dyn BookingStore>,
}

impl PaymentProcessedHandler {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
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

        let mut booking = match self.store.get(event.booking_id).await? {
            Some(booking) => booking,
            None => {
                warn!(booking_id = %event.booking_id, "payment for unknown booking, skipping");
                return Ok(());
            }
        };

        let target = if event.payment_status == "Completed" {
            BookingStatus::PaymentCompleted
        } else {
            BookingStatus::PaymentFailed
        };

        // Redelivery of the same outcome is a no-op.
        if booking.status == target {
            return Ok(());
        }

        booking.status = target;
        if target == BookingStatus::PaymentCompleted {
            booking.confirmation_date = Some(Utc::now());
        }
        booking.updated_at = Some(Utc::now());

        self.store.update(booking).await?;
        info!(booking_id = %event.booking_id, status = %target, "booking reconciled with payment");

        Ok(())
    }
}
