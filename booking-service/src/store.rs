use crate::models::Booking;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::Envelope;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub envelope: Envelope,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl OutboxRecord {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            id: Uuid::new_v4(),
            envelope,
            processed: false,
            created_at: Utc::now(),
        }
    }
}

/// Key-value seam over the booking store. Entities are addressed as
/// `booking:<id>`; writes are last-writer-wins per key. `create_with_outbox`
/// is the local transaction that makes persist + pending-publish atomic.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_with_outbox(&self, booking: Booking, envelope: Envelope) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>>;
    async fn update(&self, booking: Booking) -> Result<()>;
    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxRecord>>;
    async fn mark_outbox_processed(&self, id: Uuid) -> Result<()>;
}

fn key_for(id: Uuid) -> String {
    format!("booking:{}", id)
}

#[derive(Default)]
struct Inner {
    bookings: HashMap<String, Booking>,
    outbox: Vec<OutboxRecord>,
}

/// In-process stand-in for the key-value store; one lock section per
/// operation plays the role of the store's single-key atomicity.
#[derive(Default)]
pub struct MemoryBookingStore {
    inner: Mutex<Inner>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create_with_outbox(&self, booking: Booking, envelope: Envelope) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.bookings.insert(key_for(booking.id), booking);
        inner.outbox.push(OutboxRecord::new(envelope));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bookings.get(&key_for(id)).cloned())
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        let inner = self.inner.lock().unwrap();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn update(&self, booking: Booking) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.bookings.insert(key_for(booking.id), booking);
        Ok(())
    }

    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .outbox
            .iter()
            .filter(|record| !record.processed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_outbox_processed(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.outbox.iter_mut().find(|record| record.id == id) {
            record.processed = true;
        }
        Ok(())
    }
}
