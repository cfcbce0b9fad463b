//! Registration lifecycle service.
//!
//! Coordinates intake (validate, duplicate check, insert, confirm, log) and
//! the administrative status/payment transitions. Persistence succeeding is
//! what makes a registration successful; notification outcomes are reported
//! through `email_sent` and the notification log only.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use super::notification::RegistrationNotifier;
use super::store::{RegistrationStore, StoreError};
use super::validation::{validate_registration, RegistrationValidationError};
use crate::models::{
    AttendanceDay, NewNotificationLogEntry, NotificationLogEntry, NotificationOutcome,
    PaymentStatus, Registration, RegistrationRequest, RegistrationStats, RegistrationStatus,
};

/// Default upper bound for one notification attempt.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced to callers of the registration service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] RegistrationValidationError),

    #[error("This email is already registered")]
    DuplicateEmail,

    #[error("Registration is currently closed")]
    RegistrationClosed,

    #[error("Registration is full ({0} attendees)")]
    CapacityReached(i64),

    #[error("Invalid status '{value}'. Must be one of: {allowed}")]
    InvalidStatus { value: String, allowed: &'static str },

    #[error("Invalid day number {0}. Must be between 1 and 5.")]
    InvalidDay(i32),

    #[error("Registration not found")]
    NotFound,

    #[error("Store failure: {0}")]
    Store(String),
}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => RegistrationError::DuplicateEmail,
            StoreError::Backend(msg) => RegistrationError::Store(msg),
        }
    }
}

/// Intake limits taken from the event configuration.
#[derive(Debug, Clone)]
pub struct IntakePolicy {
    pub registration_open: bool,
    /// `None` means unlimited.
    pub max_registrations: Option<i64>,
    pub notification_timeout: Duration,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            registration_open: true,
            max_registrations: None,
            notification_timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }
}

/// Result of a successful intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub registration_id: i64,
    /// Whether the attendee confirmation was delivered.
    pub email_sent: bool,
}

/// Registration lifecycle coordinator.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
    notifier: Arc<dyn RegistrationNotifier>,
    policy: IntakePolicy,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        notifier: Arc<dyn RegistrationNotifier>,
        policy: IntakePolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Accept one attendee registration.
    ///
    /// Validation and the open/closed check happen before any store access.
    /// The email pre-check is advisory; a unique-constraint violation on
    /// insert is reported as the same [`RegistrationError::DuplicateEmail`].
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let new_registration = validate_registration(request)?;

        if !self.policy.registration_open {
            return Err(RegistrationError::RegistrationClosed);
        }

        if self
            .store
            .find_by_email(&new_registration.email)
            .await?
            .is_some()
        {
            return Err(RegistrationError::DuplicateEmail);
        }

        if let Some(capacity) = self.policy.max_registrations {
            if self.store.count().await? >= capacity {
                return Err(RegistrationError::CapacityReached(capacity));
            }
        }

        let registration = self.store.insert(&new_registration).await?;

        info!(
            registration_id = registration.id,
            days = ?registration.days.days(),
            "Registration created"
        );

        let outcome = self.confirm(&registration).await;
        self.notify_admin(registration.clone());

        Ok(RegistrationOutcome {
            registration_id: registration.id,
            email_sent: outcome.success,
        })
    }

    /// Send the confirmation and record exactly one log entry for it.
    async fn confirm(&self, registration: &Registration) -> NotificationOutcome {
        let outcome = match tokio::time::timeout(
            self.policy.notification_timeout,
            self.notifier.send_confirmation(registration),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => NotificationOutcome::failed(format!(
                "timed out after {}s",
                self.policy.notification_timeout.as_secs_f64()
            )),
        };

        if !outcome.success {
            warn!(
                registration_id = registration.id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Confirmation notification failed"
            );
        }

        let entry = NewNotificationLogEntry::confirmation(registration, &outcome);
        match self.store.record_notification(&entry).await {
            Ok(_) => outcome,
            Err(e) => {
                error!(
                    registration_id = registration.id,
                    error = %e,
                    "Failed to record confirmation outcome"
                );
                // Without the log entry the flag was not set either.
                NotificationOutcome {
                    success: false,
                    error: outcome.error,
                }
            }
        }
    }

    /// Fire-and-forget organizer alert. Outcome goes to the process log only.
    fn notify_admin(&self, registration: Registration) {
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.policy.notification_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, notifier.send_admin_notification(&registration))
                .await
            {
                Ok(outcome) if outcome.success => {}
                Ok(outcome) => warn!(
                    registration_id = registration.id,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Admin notification failed"
                ),
                Err(_) => warn!(
                    registration_id = registration.id,
                    "Admin notification timed out"
                ),
            }
        });
    }

    /// Look up a registration by email (normalized before lookup).
    pub async fn find_by_email(&self, email: &str) -> Result<Registration, RegistrationError> {
        let email = shared::validation::normalize_email(email);
        self.store
            .find_by_email(&email)
            .await?
            .ok_or(RegistrationError::NotFound)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Registration, RegistrationError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(RegistrationError::NotFound)
    }

    /// Overwrite a registration's status. Unknown values are rejected
    /// before the store is touched.
    pub async fn set_registration_status(
        &self,
        id: i64,
        status: &str,
        notes: Option<&str>,
    ) -> Result<Registration, RegistrationError> {
        let status: RegistrationStatus =
            status.parse().map_err(|_| RegistrationError::InvalidStatus {
                value: status.to_string(),
                allowed: RegistrationStatus::ALLOWED,
            })?;

        let updated = self
            .store
            .update_registration_status(id, status, notes)
            .await?
            .ok_or(RegistrationError::NotFound)?;

        info!(registration_id = id, status = %status, "Registration status updated");
        Ok(updated)
    }

    /// Overwrite a registration's payment status.
    pub async fn set_payment_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<Registration, RegistrationError> {
        let status: PaymentStatus =
            status.parse().map_err(|_| RegistrationError::InvalidStatus {
                value: status.to_string(),
                allowed: PaymentStatus::ALLOWED,
            })?;

        let updated = self
            .store
            .update_payment_status(id, status)
            .await?
            .ok_or(RegistrationError::NotFound)?;

        info!(registration_id = id, payment_status = %status, "Payment status updated");
        Ok(updated)
    }

    pub async fn list(&self) -> Result<Vec<Registration>, RegistrationError> {
        Ok(self.store.list().await?)
    }

    pub async fn list_for_day(
        &self,
        day_number: i32,
    ) -> Result<(AttendanceDay, Vec<Registration>), RegistrationError> {
        let day =
            AttendanceDay::from_number(day_number).ok_or(RegistrationError::InvalidDay(day_number))?;
        Ok((day, self.store.list_by_day(day).await?))
    }

    pub async fn list_by_status(
        &self,
        status: &str,
    ) -> Result<Vec<Registration>, RegistrationError> {
        let status: RegistrationStatus =
            status.parse().map_err(|_| RegistrationError::InvalidStatus {
                value: status.to_string(),
                allowed: RegistrationStatus::ALLOWED,
            })?;
        Ok(self.store.list_by_status(status).await?)
    }

    pub async fn stats(&self) -> Result<RegistrationStats, RegistrationError> {
        Ok(self.store.stats().await?)
    }

    pub async fn notification_log(
        &self,
        registration_id: i64,
    ) -> Result<Vec<NotificationLogEntry>, RegistrationError> {
        Ok(self.store.notification_log(registration_id).await?)
    }
}
