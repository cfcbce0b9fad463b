//! In-memory record store.
//!
//! Used for unit tests and local experiments. Uniqueness of the email is
//! checked under the same lock as the insert, so concurrent inserts of one
//! email behave like the database unique constraint.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::store::{RegistrationStore, StoreError};
use crate::models::{
    AttendanceDay, DeliveryStatus, NewNotificationLogEntry, NewRegistration, NotificationLogEntry,
    PaymentStatus, Registration, RegistrationStats, RegistrationStatus,
};

#[derive(Debug, Default)]
struct Tables {
    registrations: Vec<Registration>,
    notification_logs: Vec<NotificationLogEntry>,
    next_registration_id: i64,
    next_log_id: i64,
}

/// A [`RegistrationStore`] kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Backend`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn newest_first(mut registrations: Vec<Registration>) -> Vec<Registration> {
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        registrations
    }
}

#[async_trait::async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.registrations.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .registrations
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn insert(&self, new: &NewRegistration) -> Result<Registration, StoreError> {
        let mut tables = self.tables()?;
        if tables.registrations.iter().any(|r| r.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }

        tables.next_registration_id += 1;
        let now = Utc::now();
        let registration = Registration {
            id: tables.next_registration_id,
            full_name: new.full_name.clone(),
            email: new.email.clone(),
            affiliation: new.affiliation.clone(),
            phone: new.phone.clone(),
            research_interests: new.research_interests.clone(),
            days: new.days,
            registration_status: RegistrationStatus::default(),
            payment_status: PaymentStatus::default(),
            email_sent: false,
            email_sent_at: None,
            attendance_confirmed: false,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.tables()?.registrations.len() as i64)
    }

    async fn record_notification(
        &self,
        entry: &NewNotificationLogEntry,
    ) -> Result<NotificationLogEntry, StoreError> {
        let mut tables = self.tables()?;
        let now = Utc::now();

        // Mirrors the foreign key on notification_logs.registration_id.
        let registration = tables
            .registrations
            .iter_mut()
            .find(|r| r.id == entry.registration_id)
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "notification log references unknown registration {}",
                    entry.registration_id
                ))
            })?;

        if entry.status == DeliveryStatus::Sent {
            registration.email_sent = true;
            registration.email_sent_at = Some(now);
        }

        tables.next_log_id += 1;
        let logged = NotificationLogEntry {
            id: tables.next_log_id,
            registration_id: entry.registration_id,
            kind: entry.kind,
            recipient: entry.recipient.clone(),
            status: entry.status,
            error_message: entry.error_message.clone(),
            created_at: now,
        };
        tables.notification_logs.push(logged.clone());
        Ok(logged)
    }

    async fn notification_log(
        &self,
        registration_id: i64,
    ) -> Result<Vec<NotificationLogEntry>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .notification_logs
            .iter()
            .filter(|e| e.registration_id == registration_id)
            .cloned()
            .collect())
    }

    async fn update_registration_status(
        &self,
        id: i64,
        status: RegistrationStatus,
        notes: Option<&str>,
    ) -> Result<Option<Registration>, StoreError> {
        let mut tables = self.tables()?;
        Ok(tables
            .registrations
            .iter_mut()
            .find(|r| r.id == id)
            .map(|registration| {
                registration.registration_status = status;
                if let Some(notes) = notes {
                    registration.notes = Some(notes.to_string());
                }
                registration.updated_at = Utc::now();
                registration.clone()
            }))
    }

    async fn update_payment_status(
        &self,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Registration>, StoreError> {
        let mut tables = self.tables()?;
        Ok(tables
            .registrations
            .iter_mut()
            .find(|r| r.id == id)
            .map(|registration| {
                registration.payment_status = status;
                registration.updated_at = Utc::now();
                registration.clone()
            }))
    }

    async fn list(&self) -> Result<Vec<Registration>, StoreError> {
        let all = self.tables()?.registrations.clone();
        Ok(Self::newest_first(all))
    }

    async fn list_by_day(&self, day: AttendanceDay) -> Result<Vec<Registration>, StoreError> {
        let matching = self
            .tables()?
            .registrations
            .iter()
            .filter(|r| r.days.contains(day))
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, StoreError> {
        let matching = self
            .tables()?
            .registrations
            .iter()
            .filter(|r| r.registration_status == status)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    async fn stats(&self) -> Result<RegistrationStats, StoreError> {
        let tables = self.tables()?;
        Ok(RegistrationStats::from_registrations(
            &tables.registrations,
            Utc::now().date_naive(),
        ))
    }
}
