//! Domain models for conference registration.

pub mod notification_log;
pub mod registration;
pub mod stats;

pub use notification_log::{
    DeliveryStatus, NewNotificationLogEntry, NotificationKind, NotificationLogEntry,
    NotificationOutcome, NOT_CONFIGURED,
};
pub use registration::{
    AttendanceDay, DayAttendee, DaySelection, NewRegistration, ParseEnumError, PaymentStatus,
    Registration, RegistrationLookup, RegistrationRequest, RegistrationStatus,
    UpdatePaymentStatusRequest, UpdateRegistrationStatusRequest,
};
pub use stats::{AffiliationCount, DayCounts, RegistrationStats};
