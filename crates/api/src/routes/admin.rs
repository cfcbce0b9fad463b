//! Admin endpoint handlers: listings, statistics and status transitions.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use domain::models::{
    DayAttendee, NotificationLogEntry, Registration, RegistrationStats,
    UpdatePaymentStatusRequest, UpdateRegistrationStatusRequest,
};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct RegistrationListResponse {
    pub success: bool,
    pub registrations: Vec<Registration>,
    pub stats: RegistrationStats,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: RegistrationStats,
}

#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub success: bool,
    pub day: u8,
    pub label: &'static str,
    pub count: usize,
    pub registrations: Vec<DayAttendee>,
}

#[derive(Debug, Serialize)]
pub struct StatusListResponse {
    pub success: bool,
    pub count: usize,
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub message: &'static str,
    pub registration: Registration,
}

#[derive(Debug, Serialize)]
pub struct NotificationLogResponse {
    pub success: bool,
    pub entries: Vec<NotificationLogEntry>,
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("Invalid registration id '{}'", raw)))
}

/// GET /api/admin/registrations
pub async fn list_registrations(
    State(state): State<AppState>,
) -> Result<Json<RegistrationListResponse>, ApiError> {
    let registrations = state.registrations.list().await?;
    let stats = state.registrations.stats().await?;
    Ok(Json(RegistrationListResponse {
        success: true,
        registrations,
        stats,
    }))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.registrations.stats().await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

/// GET /api/day/:day_number
pub async fn registrations_for_day(
    State(state): State<AppState>,
    Path(day_number): Path<String>,
) -> Result<Json<DayResponse>, ApiError> {
    let number: i32 = day_number.trim().parse().map_err(|_| {
        ApiError::Validation("Invalid day number. Must be between 1 and 5.".to_string())
    })?;

    let (day, registrations) = state.registrations.list_for_day(number).await?;
    let registrations: Vec<DayAttendee> = registrations.into_iter().map(Into::into).collect();

    Ok(Json(DayResponse {
        success: true,
        day: day.number(),
        label: day.label(),
        count: registrations.len(),
        registrations,
    }))
}

/// GET /api/registrations/status/:status
pub async fn registrations_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<StatusListResponse>, ApiError> {
    let registrations = state.registrations.list_by_status(&status).await?;
    Ok(Json(StatusListResponse {
        success: true,
        count: registrations.len(),
        registrations,
    }))
}

/// PUT /api/registration/:id/status
pub async fn update_registration_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRegistrationStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;

    let registration = state
        .registrations
        .set_registration_status(id, &request.status, request.notes.as_deref())
        .await?;

    Ok(Json(UpdateResponse {
        success: true,
        message: "Status updated successfully",
        registration,
    }))
}

/// PUT /api/registration/:id/payment
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePaymentStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;

    let registration = state
        .registrations
        .set_payment_status(id, &request.status)
        .await?;

    Ok(Json(UpdateResponse {
        success: true,
        message: "Payment status updated successfully",
        registration,
    }))
}

/// GET /api/admin/registrations/:id/notifications
pub async fn notification_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationLogResponse>, ApiError> {
    let id = parse_id(&id)?;
    // Unknown ids are 404 rather than an empty log.
    state.registrations.find_by_id(id).await?;
    let entries = state.registrations.notification_log(id).await?;
    Ok(Json(NotificationLogResponse {
        success: true,
        entries,
    }))
}
