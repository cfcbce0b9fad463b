//! Notification log repository.

use domain::models::{DeliveryStatus, NewNotificationLogEntry};
use sqlx::PgPool;

use crate::entities::NotificationLogEntity;
use crate::metrics::QueryTimer;

/// Repository for the append-only notification log.
#[derive(Clone)]
pub struct NotificationLogRepository {
    pool: PgPool,
}

impl NotificationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry. A `sent` entry also marks the registration's
    /// confirmation as delivered, in the same transaction.
    pub async fn record(
        &self,
        entry: &NewNotificationLogEntry,
    ) -> Result<NotificationLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("record_notification");
        let mut tx = self.pool.begin().await?;

        let logged = sqlx::query_as::<_, NotificationLogEntity>(
            r#"
            INSERT INTO notification_logs (registration_id, kind, recipient, status, error_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, registration_id, kind, recipient, status, error_message, created_at
            "#,
        )
        .bind(entry.registration_id)
        .bind(entry.kind.as_str())
        .bind(&entry.recipient)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .fetch_one(&mut *tx)
        .await?;

        if entry.status == DeliveryStatus::Sent {
            sqlx::query(
                r#"
                UPDATE registrations
                SET email_sent = TRUE, email_sent_at = $2
                WHERE id = $1
                "#,
            )
            .bind(entry.registration_id)
            .bind(logged.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(logged)
    }

    /// Entries for one registration, oldest first.
    pub async fn find_by_registration(
        &self,
        registration_id: i64,
    ) -> Result<Vec<NotificationLogEntity>, sqlx::Error> {
        sqlx::query_as::<_, NotificationLogEntity>(
            r#"
            SELECT id, registration_id, kind, recipient, status, error_message, created_at
            FROM notification_logs
            WHERE registration_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(registration_id)
        .fetch_all(&self.pool)
        .await
    }
}
