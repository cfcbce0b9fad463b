//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod notification_log;
pub mod registration;

pub use notification_log::NotificationLogEntity;
pub use registration::{AffiliationCountEntity, RegistrationEntity, RegistrationTotalsEntity};
