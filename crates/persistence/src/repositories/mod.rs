//! Repository implementations for database operations.

pub mod notification_log;
pub mod registration;

pub use notification_log::NotificationLogRepository;
pub use registration::RegistrationRepository;
