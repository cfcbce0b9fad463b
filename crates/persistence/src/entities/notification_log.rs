//! Notification log entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{DeliveryStatus, NotificationKind, NotificationLogEntry};
use sqlx::FromRow;

/// Database row mapping for the notification_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationLogEntity {
    pub id: i64,
    pub registration_id: i64,
    pub kind: String,
    pub recipient: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationLogEntity> for NotificationLogEntry {
    fn from(entity: NotificationLogEntity) -> Self {
        Self {
            id: entity.id,
            registration_id: entity.registration_id,
            kind: entity
                .kind
                .parse()
                .unwrap_or(NotificationKind::Confirmation),
            recipient: entity.recipient,
            status: entity.status.parse().unwrap_or(DeliveryStatus::Failed),
            error_message: entity.error_message,
            created_at: entity.created_at,
        }
    }
}
