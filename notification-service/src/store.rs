use crate::models::{Notification, NotificationStatus};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Notification store seam. Creation goes through `upsert_by_dedup_key`:
/// the first write for a dedup key inserts, every later write for the same
/// key returns the stored notification untouched, which is what makes
/// at-least-once redelivery safe.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn upsert_by_dedup_key(&self, notification: Notification) -> Result<Notification>;
    async fn update(&self, notification: Notification) -> Result<()>;
    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<Notification>>;
    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Vec<Notification>>;
    async fn get_pending(&self) -> Result<Vec<Notification>>;
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    by_dedup_key: Mutex<HashMap<String, Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn upsert_by_dedup_key(&self, notification: Notification) -> Result<Notification> {
        let mut map = self.by_dedup_key.lock().unwrap();
        let stored = map
            .entry(notification.dedup_key.clone())
            .or_insert(notification);
        Ok(stored.clone())
    }

    async fn update(&self, notification: Notification) -> Result<()> {
        let mut map = self.by_dedup_key.lock().unwrap();
        map.insert(notification.dedup_key.clone(), notification);
        Ok(())
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let map = self.by_dedup_key.lock().unwrap();
        let mut notifications: Vec<Notification> = map
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by_key(|n| n.created_at);
        Ok(notifications)
    }

    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Vec<Notification>> {
        let map = self.by_dedup_key.lock().unwrap();
        let mut notifications: Vec<Notification> = map
            .values()
            .filter(|n| n.booking_id == Some(booking_id))
            .cloned()
            .collect();
        notifications.sort_by_key(|n| n.created_at);
        Ok(notifications)
    }

    async fn get_pending(&self) -> Result<Vec<Notification>> {
        let map = self.by_dedup_key.lock().unwrap();
        Ok(map
            .values()
            .filter(|n| n.status == NotificationStatus::Pending)
            .cloned()
            .collect())
    }
}
