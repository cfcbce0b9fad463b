//! Registration entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{DaySelection, Registration};
use sqlx::FromRow;

/// Database row mapping for the registrations table.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationEntity {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub affiliation: String,
    pub phone: Option<String>,
    pub research_interests: Option<String>,
    pub day1: bool,
    pub day2: bool,
    pub day3: bool,
    pub day4: bool,
    pub day5: bool,
    pub registration_status: String,
    pub payment_status: String,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub attendance_confirmed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegistrationEntity> for Registration {
    fn from(entity: RegistrationEntity) -> Self {
        Self {
            id: entity.id,
            full_name: entity.full_name,
            email: entity.email,
            affiliation: entity.affiliation,
            phone: entity.phone,
            research_interests: entity.research_interests,
            days: DaySelection {
                day1: entity.day1,
                day2: entity.day2,
                day3: entity.day3,
                day4: entity.day4,
                day5: entity.day5,
            },
            // CHECK constraints keep these columns within the known values.
            registration_status: entity.registration_status.parse().unwrap_or_default(),
            payment_status: entity.payment_status.parse().unwrap_or_default(),
            email_sent: entity.email_sent,
            email_sent_at: entity.email_sent_at,
            attendance_confirmed: entity.attendance_confirmed,
            notes: entity.notes,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Aggregate row for the dashboard statistics query.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationTotalsEntity {
    pub total: i64,
    pub today: i64,
    pub emails_sent: i64,
    pub day1: i64,
    pub day2: i64,
    pub day3: i64,
    pub day4: i64,
    pub day5: i64,
}

/// Row of the per-affiliation breakdown.
#[derive(Debug, Clone, FromRow)]
pub struct AffiliationCountEntity {
    pub affiliation: String,
    pub count: i64,
}
