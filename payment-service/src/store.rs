use crate::models::{OutboxEventRow, Payment, PaymentRow};
use crate::schema::{outbox_events, payments};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::Envelope;
use diesel::prelude::*;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Debug, Clone)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub envelope: Envelope,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Relational seam over the payment store. `finalize_with_outbox` is the
/// local transaction binding the terminal status write to its
/// PaymentProcessed announcement.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<()>;
    async fn finalize_with_outbox(&self, payment: Payment, envelope: Envelope) -> Result<()>;
    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>>;
    async fn pending_outbox(&self, limit: i64) -> Result<Vec<OutboxRecord>>;
    async fn mark_outbox_processed(&self, id: Uuid) -> Result<()>;
}

pub struct DieselPaymentStore {
    pool: DbPool,
}

impl DieselPaymentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for DieselPaymentStore {
    async fn create(&self, payment: Payment) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let row = PaymentRow::from(payment);

        diesel::insert_into(payments::table)
            .values(&row)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn finalize_with_outbox(&self, payment: Payment, envelope: Envelope) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let outbox_row = OutboxEventRow {
            id: Uuid::new_v4(),
            dedup_key: envelope.dedup_key.clone(),
            envelope: serde_json::to_value(&envelope)?,
            processed: false,
            created_at: Utc::now(),
        };
        let payment_id = payment.id;
        let status = payment.status.to_string();
        let updated_at = payment.updated_at;

        conn.transaction::<_, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                diesel::update(payments::table.filter(payments::id.eq(payment_id)))
                    .set((
                        payments::status.eq(status),
                        payments::updated_at.eq(updated_at),
                    ))
                    .execute(conn)
                    .await?;

                diesel::insert_into(outbox_events::table)
                    .values(&outbox_row)
                    .execute(conn)
                    .await?;

                Ok(())
            })
        })
        .await?;

        Ok(())
    }

    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let mut conn = self.pool.get().await?;

        let row = payments::table
            .filter(payments::booking_id.eq(booking_id))
            .first::<PaymentRow>(&mut conn)
            .await
            .optional()?;

        row.map(Payment::try_from).transpose()
    }

    async fn pending_outbox(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let mut conn = self.pool.get().await?;

        let rows = outbox_events::table
            .filter(outbox_events::processed.eq(false))
            .order(outbox_events::created_at.asc())
            .limit(limit)
            .load::<OutboxEventRow>(&mut conn)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OutboxRecord {
                    id: row.id,
                    envelope: serde_json::from_value(row.envelope)?,
                    processed: row.processed,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn mark_outbox_processed(&self, id: Uuid) -> Result<()> {
        let mut conn = self.pool.get().await?;

        diesel::update(outbox_events::table.filter(outbox_events::id.eq(id)))
            .set(outbox_events::processed.eq(true))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    payments: HashMap<Uuid, Payment>,
    outbox: Vec<OutboxRecord>,
    status_audit: Vec<String>,
}

/// Test double with the same transactional contract as the diesel store.
/// Records every status write so tests can assert the Processing ->
/// Completed order relative to the outbox insert.
#[derive(Default)]
pub struct MemoryPaymentStore {
    inner: Mutex<Inner>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_audit(&self) -> Vec<String> {
        self.inner.lock().unwrap().status_audit.clone()
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn create(&self, payment: Payment) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_audit.push(payment.status.to_string());
        inner.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn finalize_with_outbox(&self, payment: Payment, envelope: Envelope) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_audit.push(payment.status.to_string());
        inner.payments.insert(payment.id, payment);
        inner.outbox.push(OutboxRecord {
            id: Uuid::new_v4(),
            envelope,
            processed: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .payments
            .values()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn pending_outbox(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .outbox
            .iter()
            .filter(|record| !record.processed)
            .take(limit as usize)
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
