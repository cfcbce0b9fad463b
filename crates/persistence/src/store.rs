//! PostgreSQL-backed [`RegistrationStore`].

use domain::models::{
    AffiliationCount, AttendanceDay, DayCounts, NewNotificationLogEntry, NewRegistration,
    NotificationLogEntry, PaymentStatus, Registration, RegistrationStats, RegistrationStatus,
};
use domain::services::{RegistrationStore, StoreError};
use sqlx::PgPool;

use crate::repositories::{NotificationLogRepository, RegistrationRepository};

/// PostgreSQL unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            tracing::debug!(constraint = ?db_err.constraint(), "Unique constraint rejected write");
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Backend(err.to_string())
}

/// Record store over the `registrations` and `notification_logs` tables.
#[derive(Clone)]
pub struct PgRegistrationStore {
    registrations: RegistrationRepository,
    notification_logs: NotificationLogRepository,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            registrations: RegistrationRepository::new(pool.clone()),
            notification_logs: NotificationLogRepository::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.registrations.pool()
    }
}

#[async_trait::async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, StoreError> {
        let entity = self.registrations.find_by_id(id).await.map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError> {
        let entity = self
            .registrations
            .find_by_email(email)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn insert(&self, registration: &NewRegistration) -> Result<Registration, StoreError> {
        let entity = self
            .registrations
            .insert(registration)
            .await
            .map_err(store_error)?;
        Ok(entity.into())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        self.registrations.count().await.map_err(store_error)
    }

    async fn record_notification(
        &self,
        entry: &NewNotificationLogEntry,
    ) -> Result<NotificationLogEntry, StoreError> {
        let entity = self
            .notification_logs
            .record(entry)
            .await
            .map_err(store_error)?;
        Ok(entity.into())
    }

    async fn notification_log(
        &self,
        registration_id: i64,
    ) -> Result<Vec<NotificationLogEntry>, StoreError> {
        let entities = self
            .notification_logs
            .find_by_registration(registration_id)
            .await
            .map_err(store_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn update_registration_status(
        &self,
        id: i64,
        status: RegistrationStatus,
        notes: Option<&str>,
    ) -> Result<Option<Registration>, StoreError> {
        let entity = self
            .registrations
            .update_status(id, status, notes)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn update_payment_status(
        &self,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Registration>, StoreError> {
        let entity = self
            .registrations
            .update_payment_status(id, status)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Registration>, StoreError> {
        let entities = self.registrations.list().await.map_err(store_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_by_day(&self, day: AttendanceDay) -> Result<Vec<Registration>, StoreError> {
        let entities = self
            .registrations
            .list_by_day(day)
            .await
            .map_err(store_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, StoreError> {
        let entities = self
            .registrations
            .list_by_status(status)
            .await
            .map_err(store_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn stats(&self) -> Result<RegistrationStats, StoreError> {
        let totals = self.registrations.totals().await.map_err(store_error)?;
        let affiliations = self
            .registrations
            .affiliation_counts()
            .await
            .map_err(store_error)?;

        Ok(RegistrationStats {
            total: totals.total,
            today: totals.today,
            emails_sent: totals.emails_sent,
            by_affiliation: affiliations
                .into_iter()
                .map(|row| AffiliationCount {
                    affiliation: row.affiliation,
                    count: row.count,
                })
                .collect(),
            by_day: DayCounts {
                day1: totals.day1,
                day2: totals.day2,
                day3: totals.day3,
                day4: totals.day4,
                day5: totals.day5,
            },
        })
    }
}
