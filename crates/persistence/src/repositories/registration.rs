//! Registration repository for database operations.

use domain::models::{AttendanceDay, NewRegistration, PaymentStatus, RegistrationStatus};
use sqlx::PgPool;

use crate::entities::{AffiliationCountEntity, RegistrationEntity, RegistrationTotalsEntity};
use crate::metrics::QueryTimer;

const REGISTRATION_COLUMNS: &str = r#"
    id, full_name, email, affiliation, phone, research_interests,
    day1, day2, day3, day4, day5, registration_status, payment_status,
    email_sent, email_sent_at, attendance_confirmed, notes, created_at, updated_at
"#;

/// Repository for registration database operations.
#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    /// Creates a new RegistrationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_id");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            "SELECT {} FROM registrations WHERE id = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a registration by its normalized email.
    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_email");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            "SELECT {} FROM registrations WHERE email = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a registration. A taken email surfaces as a unique violation
    /// (SQLSTATE 23505) on `registrations_email_unique`.
    pub async fn insert(
        &self,
        registration: &NewRegistration,
    ) -> Result<RegistrationEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_registration");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            INSERT INTO registrations (
                full_name, email, affiliation, phone, research_interests,
                day1, day2, day3, day4, day5
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(&registration.full_name)
        .bind(&registration.email)
        .bind(&registration.affiliation)
        .bind(&registration.phone)
        .bind(&registration.research_interests)
        .bind(registration.days.day1)
        .bind(registration.days.day2)
        .bind(registration.days.day3)
        .bind(registration.days.day4)
        .bind(registration.days.day5)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registrations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Set the registration status. Existing notes are kept when `notes` is None.
    pub async fn update_status(
        &self,
        id: i64,
        status: RegistrationStatus,
        notes: Option<&str>,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_registration_status");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            UPDATE registrations
            SET registration_status = $2,
                notes = COALESCE($3, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update_payment_status(
        &self,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_payment_status");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            UPDATE registrations
            SET payment_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All registrations, newest first.
    pub async fn list(&self) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_registrations");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            "SELECT {} FROM registrations ORDER BY created_at DESC, id DESC",
            REGISTRATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Registrations attending `day`, newest first.
    pub async fn list_by_day(
        &self,
        day: AttendanceDay,
    ) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        // The column name comes from a closed enum, never from input.
        let timer = QueryTimer::new("list_registrations_by_day");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            "SELECT {} FROM registrations WHERE {} = TRUE ORDER BY created_at DESC, id DESC",
            REGISTRATION_COLUMNS,
            day.token()
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_registrations_by_status");
        let result = sqlx::query_as::<_, RegistrationEntity>(&format!(
            r#"
            SELECT {} FROM registrations
            WHERE registration_status = $1
            ORDER BY created_at DESC, id DESC
            "#,
            REGISTRATION_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Totals for the dashboard. "Today" is the current UTC date.
    pub async fn totals(&self) -> Result<RegistrationTotalsEntity, sqlx::Error> {
        let timer = QueryTimer::new("registration_totals");
        let result = sqlx::query_as::<_, RegistrationTotalsEntity>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (
                    WHERE (created_at AT TIME ZONE 'UTC')::date = (NOW() AT TIME ZONE 'UTC')::date
                ) AS today,
                COUNT(*) FILTER (WHERE email_sent) AS emails_sent,
                COUNT(*) FILTER (WHERE day1) AS day1,
                COUNT(*) FILTER (WHERE day2) AS day2,
                COUNT(*) FILTER (WHERE day3) AS day3,
                COUNT(*) FILTER (WHERE day4) AS day4,
                COUNT(*) FILTER (WHERE day5) AS day5
            FROM registrations
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Per-affiliation counts, largest first.
    pub async fn affiliation_counts(&self) -> Result<Vec<AffiliationCountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("registration_affiliation_counts");
        let result = sqlx::query_as::<_, AffiliationCountEntity>(
            r#"
            SELECT affiliation, COUNT(*) AS count
            FROM registrations
            GROUP BY affiliation
            ORDER BY count DESC, affiliation ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
