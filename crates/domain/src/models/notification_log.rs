//! Notification log domain model.
//!
//! One entry is appended per confirmation attempt. Entries are never updated
//! or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::registration::{ParseEnumError, Registration};

/// Error text reported when no delivery channel is configured.
pub const NOT_CONFIGURED: &str = "not configured";

/// Kind of message sent for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Attendee-facing confirmation. Logged.
    Confirmation,
    /// Organizer alert about a new registration. Never logged.
    AdminAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "confirmation",
            NotificationKind::AdminAlert => "admin_alert",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmation" => Ok(NotificationKind::Confirmation),
            "admin_alert" => Ok(NotificationKind::AdminAlert),
            other => Err(ParseEnumError {
                kind: "notification kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(ParseEnumError {
                kind: "delivery status",
                value: other.to_string(),
            }),
        }
    }
}

/// Result of a single notification attempt.
///
/// Delivery problems are values, not errors: callers record them and move on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationOutcome {
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    /// No delivery channel is set up. Distinct from a transmission failure.
    pub fn not_configured() -> Self {
        Self::failed(NOT_CONFIGURED)
    }

    pub fn is_not_configured(&self) -> bool {
        !self.success && self.error.as_deref() == Some(NOT_CONFIGURED)
    }

    pub fn delivery_status(&self) -> DeliveryStatus {
        if self.success {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        }
    }
}

/// A persisted notification log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLogEntry {
    pub id: i64,
    pub registration_id: i64,
    pub kind: NotificationKind,
    pub recipient: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A log entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotificationLogEntry {
    pub registration_id: i64,
    pub kind: NotificationKind,
    pub recipient: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
}

impl NewNotificationLogEntry {
    /// Builds the entry recording a confirmation attempt for `registration`.
    pub fn confirmation(registration: &Registration, outcome: &NotificationOutcome) -> Self {
        Self {
            registration_id: registration.id,
            kind: NotificationKind::Confirmation,
            recipient: registration.email.clone(),
            status: outcome.delivery_status(),
            error_message: outcome.error.clone(),
        }
    }
}
