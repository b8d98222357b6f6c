use crate::models::Flight;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// Document-store seam over the flight collection. Writes are
/// last-writer-wins per flight id. `apply_seat_decrement` is the one
/// read-modify-write the choreography needs and carries its own dedup
/// bookkeeping so a redelivered event cannot decrement twice.
#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn create(&self, flight: Flight) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Flight>>;
    /// Calendar-day window on departure_time, exact match on airports.
    async fn search(
        &self,
        departure_airport: &str,
        arrival_airport: &str,
        departure_date: NaiveDate,
    ) -> Result<Vec<Flight>>;
    /// Returns the updated flight, or None when the dedup key was already
    /// applied or the flight is unknown.
    async fn apply_seat_decrement(
        &self,
        flight_id: Uuid,
        seats: i32,
        dedup_key: &str,
    ) -> Result<Option<Flight>>;
}

#[derive(Default)]
struct Inner {
    flights: HashMap<Uuid, Flight>,
    applied_keys: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryFlightStore {
    inner: Mutex<Inner>,
}

impl MemoryFlightStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlightStore for MemoryFlightStore {
    async fn create(&self, flight: Flight) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.flights.insert(flight.id, flight);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Flight>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.flights.get(&id).cloned())
    }

    async fn search(
        &self,
        departure_airport: &str,
        arrival_airport: &str,
        departure_date: NaiveDate,
    ) -> Result<Vec<Flight>> {
        let inner = self.inner.lock().unwrap();
        let mut flights: Vec<Flight> = inner
            .flights
            .values()
            .filter(|f| {
                f.departure_airport == departure_airport
                    && f.arrival_airport == arrival_airport
                    && f.departure_time.date_naive() == departure_date
            })
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }

    async fn apply_seat_decrement(
        &self,
        flight_id: Uuid,
        seats: i32,
        dedup_key: &str,
    ) -> Result<Option<Flight>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.applied_keys.contains(dedup_key) {
            return Ok(None);
        }
        let Some(flight) = inner.flights.get_mut(&flight_id) else {
            return Ok(None);
        };

        flight.available_seats = (flight.available_seats - seats).max(0);
        flight.updated_at = Some(Utc::now());
        let updated = flight.clone();
        inner.applied_keys.insert(dedup_key.to_string());

        Ok(Some(updated))
    }
}
