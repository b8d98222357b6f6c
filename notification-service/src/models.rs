use chrono::{DateTime, Utc};
use contracts::NotificationType;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Created in Pending by a consumer handler and moved to Sent after the
/// channel dispatch. `dedup_key` is the producer-assigned envelope key; the
/// store upserts on it so redelivery never mints a second identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub subject: String,
    pub message: String,
    pub recipient: String,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn pending(
        user_id: Uuid,
        booking_id: Option<Uuid>,
        notification_type: NotificationType,
        subject: String,
        message: String,
        recipient: String,
        dedup_key: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            booking_id,
            notification_type,
            subject,
            message,
            recipient,
            status: NotificationStatus::Pending,
            sent_at: None,
            error_message: None,
            retry_count: 0,
            dedup_key,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
    Read,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationStatus::Pending => "Pending",
            NotificationStatus::Sent => "Sent",
            NotificationStatus::Failed => "Failed",
            NotificationStatus::Delivered => "Delivered",
            NotificationStatus::Read => "Read",
        };
        f.write_str(name)
    }
}
