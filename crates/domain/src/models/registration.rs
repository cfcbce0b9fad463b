//! Registration domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Error returned when a day token or status string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// One day of the five-day event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceDay {
    Day1,
    Day2,
    Day3,
    Day4,
    Day5,
}

impl AttendanceDay {
    /// All days in event order.
    pub const ALL: [AttendanceDay; 5] = [
        AttendanceDay::Day1,
        AttendanceDay::Day2,
        AttendanceDay::Day3,
        AttendanceDay::Day4,
        AttendanceDay::Day5,
    ];

    /// Wire token (`day1`..`day5`).
    pub fn token(&self) -> &'static str {
        match self {
            AttendanceDay::Day1 => "day1",
            AttendanceDay::Day2 => "day2",
            AttendanceDay::Day3 => "day3",
            AttendanceDay::Day4 => "day4",
            AttendanceDay::Day5 => "day5",
        }
    }

    /// One-based day number.
    pub fn number(&self) -> u8 {
        match self {
            AttendanceDay::Day1 => 1,
            AttendanceDay::Day2 => 2,
            AttendanceDay::Day3 => 3,
            AttendanceDay::Day4 => 4,
            AttendanceDay::Day5 => 5,
        }
    }

    /// Looks up a day by its one-based number.
    pub fn from_number(number: i32) -> Option<Self> {
        match number {
            1 => Some(AttendanceDay::Day1),
            2 => Some(AttendanceDay::Day2),
            3 => Some(AttendanceDay::Day3),
            4 => Some(AttendanceDay::Day4),
            5 => Some(AttendanceDay::Day5),
            _ => None,
        }
    }

    /// Human-readable label shown to attendees.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceDay::Day1 => "Day 1 - Nov 10",
            AttendanceDay::Day2 => "Day 2 - Nov 11",
            AttendanceDay::Day3 => "Day 3 - Nov 12",
            AttendanceDay::Day4 => "Day 4 - Nov 13",
            AttendanceDay::Day5 => "Day 5 - Nov 14",
        }
    }
}

impl fmt::Display for AttendanceDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for AttendanceDay {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttendanceDay::ALL
            .into_iter()
            .find(|day| day.token() == s)
            .ok_or_else(|| ParseEnumError::new("day", s))
    }
}

/// Attendance flags over the five event days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySelection {
    pub day1: bool,
    pub day2: bool,
    pub day3: bool,
    pub day4: bool,
    pub day5: bool,
}

impl DaySelection {
    /// Builds a selection from a set of days. Repeated days collapse.
    pub fn from_days(days: impl IntoIterator<Item = AttendanceDay>) -> Self {
        let mut selection = Self::default();
        for day in days {
            selection.set(day, true);
        }
        selection
    }

    pub fn set(&mut self, day: AttendanceDay, attending: bool) {
        match day {
            AttendanceDay::Day1 => self.day1 = attending,
            AttendanceDay::Day2 => self.day2 = attending,
            AttendanceDay::Day3 => self.day3 = attending,
            AttendanceDay::Day4 => self.day4 = attending,
            AttendanceDay::Day5 => self.day5 = attending,
        }
    }

    pub fn contains(&self, day: AttendanceDay) -> bool {
        match day {
            AttendanceDay::Day1 => self.day1,
            AttendanceDay::Day2 => self.day2,
            AttendanceDay::Day3 => self.day3,
            AttendanceDay::Day4 => self.day4,
            AttendanceDay::Day5 => self.day5,
        }
    }

    /// Selected days in event order.
    pub fn days(&self) -> Vec<AttendanceDay> {
        AttendanceDay::ALL
            .into_iter()
            .filter(|day| self.contains(*day))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.days().is_empty()
    }

    /// Labels of the selected days, e.g. `"Day 1 - Nov 10"`.
    pub fn labels(&self) -> Vec<String> {
        self.days()
            .into_iter()
            .map(|day| day.label().to_string())
            .collect()
    }
}

/// Lifecycle status of a registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Active,
    Cancelled,
    Waitlist,
    Confirmed,
    Completed,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 5] = [
        RegistrationStatus::Active,
        RegistrationStatus::Cancelled,
        RegistrationStatus::Waitlist,
        RegistrationStatus::Confirmed,
        RegistrationStatus::Completed,
    ];

    /// Comma-separated list of accepted values, for error messages.
    pub const ALLOWED: &'static str = "active, cancelled, waitlist, confirmed, completed";

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Active => "active",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Waitlist => "waitlist",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegistrationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("registration status", s))
    }
}

/// Payment state of a registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
    Waived,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
        PaymentStatus::Waived,
    ];

    pub const ALLOWED: &'static str = "pending, paid, refunded, waived";

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Waived => "waived",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("payment status", s))
    }
}

/// A persisted attendee registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub affiliation: String,
    pub phone: Option<String>,
    pub research_interests: Option<String>,
    #[serde(flatten)]
    pub days: DaySelection,
    pub registration_status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub attendance_confirmed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw intake payload, exactly as submitted by the registration form.
///
/// Every field is optional at this layer so that a missing field surfaces as
/// a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub selected_days: Option<Vec<String>>,
}

/// Validated and normalized registration, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewRegistration {
    #[validate(length(max = 200, message = "Full name must be at most 200 characters"))]
    pub full_name: String,

    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    pub email: String,

    #[validate(length(max = 200, message = "Affiliation must be at most 200 characters"))]
    pub affiliation: String,

    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: Option<String>,

    #[validate(length(
        max = 2000,
        message = "Research interests must be at most 2000 characters"
    ))]
    pub research_interests: Option<String>,

    pub days: DaySelection,
}

/// Public view of a registration returned by the lookup-by-email endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationLookup {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub affiliation: String,
    pub registration_date: DateTime<Utc>,
    pub email_sent: bool,
    pub selected_days: Vec<String>,
}

impl From<Registration> for RegistrationLookup {
    fn from(r: Registration) -> Self {
        Self {
            selected_days: r.days.labels(),
            id: r.id,
            full_name: r.full_name,
            email: r.email,
            affiliation: r.affiliation,
            registration_date: r.created_at,
            email_sent: r.email_sent,
        }
    }
}

/// Condensed attendee row for per-day listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAttendee {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub affiliation: String,
}

impl From<Registration> for DayAttendee {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            full_name: r.full_name,
            email: r.email,
            affiliation: r.affiliation,
        }
    }
}

/// Request payload for changing a registration's status.
///
/// `status` stays a plain string so that unknown values are reported as an
/// invalid status instead of a body parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRegistrationStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request payload for changing a registration's payment status.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: String,
}
