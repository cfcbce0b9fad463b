//! Record store seam.
//!
//! The registration lifecycle talks to durable storage only through
//! [`RegistrationStore`]. The PostgreSQL implementation lives in the
//! persistence crate; [`super::memory_store::InMemoryRegistrationStore`]
//! backs unit tests.

use thiserror::Error;

use crate::models::{
    AttendanceDay, NewNotificationLogEntry, NewRegistration, NotificationLogEntry, PaymentStatus,
    Registration, RegistrationStats, RegistrationStatus,
};

/// Errors reported by a record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The unique constraint on the normalized email rejected an insert.
    #[error("Email already registered")]
    DuplicateEmail,

    /// Any other storage failure. The message is for logs only.
    #[error("Store failure: {0}")]
    Backend(String),
}

/// Durable storage for registrations and their notification log.
#[async_trait::async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, StoreError>;

    /// Lookup by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError>;

    /// Atomically insert a registration with default status fields.
    ///
    /// Must fail with [`StoreError::DuplicateEmail`] when the email is taken,
    /// regardless of any earlier lookup.
    async fn insert(&self, registration: &NewRegistration) -> Result<Registration, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Append a notification log entry. When the entry records a successful
    /// delivery, the registration's `email_sent`/`email_sent_at` are set in
    /// the same unit of work.
    async fn record_notification(
        &self,
        entry: &NewNotificationLogEntry,
    ) -> Result<NotificationLogEntry, StoreError>;

    async fn notification_log(
        &self,
        registration_id: i64,
    ) -> Result<Vec<NotificationLogEntry>, StoreError>;

    /// Overwrite the registration status, keeping existing notes when `notes`
    /// is `None`. Returns `None` for an unknown id.
    async fn update_registration_status(
        &self,
        id: i64,
        status: RegistrationStatus,
        notes: Option<&str>,
    ) -> Result<Option<Registration>, StoreError>;

    /// Overwrite the payment status. Returns `None` for an unknown id.
    async fn update_payment_status(
        &self,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Registration>, StoreError>;

    /// All registrations, newest first.
    async fn list(&self) -> Result<Vec<Registration>, StoreError>;

    /// Registrations attending `day`, newest first.
    async fn list_by_day(&self, day: AttendanceDay) -> Result<Vec<Registration>, StoreError>;

    /// Registrations with `status`, newest first.
    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, StoreError>;

    async fn stats(&self) -> Result<RegistrationStats, StoreError>;
}
