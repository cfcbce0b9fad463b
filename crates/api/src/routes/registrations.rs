//! Public registration endpoint handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{RegistrationLookup, RegistrationRequest};
use domain::services::RegistrationError;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_registration;

const REGISTERED_MESSAGE: &str =
    "Registration successful! Please check your email for confirmation.";

/// Response for a successful registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub registration_id: i64,
    pub email_sent: bool,
}

/// Response for the lookup-by-email endpoint.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub success: bool,
    pub registration: RegistrationLookup,
}

fn outcome_label(err: &RegistrationError) -> &'static str {
    match err {
        RegistrationError::Validation(_) | RegistrationError::InvalidDay(_) => "invalid",
        RegistrationError::DuplicateEmail => "duplicate_email",
        RegistrationError::RegistrationClosed => "closed",
        RegistrationError::CapacityReached(_) => "capacity_reached",
        RegistrationError::InvalidStatus { .. } | RegistrationError::NotFound => "invalid",
        RegistrationError::Store(_) => "error",
    }
}

/// Register an attendee.
///
/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;

    match state.registrations.register(&request).await {
        Ok(outcome) => {
            record_registration("created");
            info!(
                registration_id = outcome.registration_id,
                email_sent = outcome.email_sent,
                "Registration accepted"
            );
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    success: true,
                    message: REGISTERED_MESSAGE,
                    registration_id: outcome.registration_id,
                    email_sent: outcome.email_sent,
                }),
            ))
        }
        Err(err) => {
            record_registration(outcome_label(&err));
            Err(err.into())
        }
    }
}

/// Look up a registration by email.
///
/// GET /api/registration/:email
pub async fn lookup_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<LookupResponse>, ApiError> {
    let registration = state.registrations.find_by_email(&email).await?;
    Ok(Json(LookupResponse {
        success: true,
        registration: registration.into(),
    }))
}
