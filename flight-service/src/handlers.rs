use crate::models::{Flight, FlightStatus};
use crate::store::FlightStore;
use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use contracts::{Envelope, FlightSeatsUpdated, Message};
use messaging::{EventPublisher, HandlerError, MessageHandler};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateFlight {
    pub flight_number: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub price_per_seat: BigDecimal,
    pub aircraft_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateFlightResponse {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub status: FlightStatus,
}

pub struct FlightCommands {
    store: Arc<dyn FlightStore>,
}

impl FlightCommands {
    pub fn new(store: Arc<dyn FlightStore>) -> Self {
        Self { store }
    }

    pub async fn create_flight(&self, command: CreateFlight) -> Result<CreateFlightResponse> {
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: command.flight_number,
            airline: command.airline,
            departure_airport: command.departure_airport,
            arrival_airport: command.arrival_airport,
            departure_time: command.departure_time,
            arrival_time: command.arrival_time,
            total_seats: command.total_seats,
            available_seats: command.total_seats,
            price_per_seat: command.price_per_seat,
            status: FlightStatus::Scheduled,
            aircraft_type: command.aircraft_type,
            created_at: Utc::now(),
            updated_at: None,
        };

        let response = CreateFlightResponse {
            flight_id: flight.id,
            flight_number: flight.flight_number.clone(),
            status: flight.status,
        };

        self.store.create(flight).await?;
        info!(flight_id = %response.flight_id, "flight created");

        Ok(response)
    }

    pub async fn search_flights(
        &self,
        departure_airport: &str,
        arrival_airport: &str,
        departure_date: NaiveDate,
    ) -> Result<Vec<Flight>> {
        self.store
            .search(departure_airport, arrival_airport, departure_date)
            .await
    }

    pub async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>> {
        self.store.get(id).await
    }
}

/// Keeps the seat inventory in step with bookings. One decrement per
/// logical BookingCreated (dedup key), then a FlightSeatsUpdated
/// announcement. The announcement is publish-after-persist with no
/// atomicity: a transport failure leaves the decrement in place and is
/// only logged.
pub struct BookingCreatedHandler {
    store: Arc<dyn FlightStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl BookingCreatedHandler {
    pub fn new(store: Arc<dyn FlightStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
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

        let updated = self
            .store
            .apply_seat_decrement(event.flight_id, event.number_of_seats, &envelope.dedup_key)
            .await?;

        let Some(flight) = updated else {
            info!(flight_id = %event.flight_id, "seat decrement skipped (duplicate or unknown flight)");
            return Ok(());
        };

        let seats_event = FlightSeatsUpdated {
            flight_id: flight.id,
            available_seats: flight.available_seats,
            updated_at: flight.updated_at.unwrap_or_else(Utc::now),
        };
        let announcement = Envelope::new(Message::FlightSeatsUpdated(seats_event));

        if let Err(e) = self.publisher.publish(&announcement).await {
            warn!("Failed to publish seat update for {}: {}", flight.id, e);
        }

        Ok(())
    }
}
