// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_admin, require_company};

use crate::models::{
    AppointmentError, AppointmentListQuery, ScheduleAppointmentRequest, UpdateAppointmentRequest,
};
use crate::state::AppointmentCellState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<usize>,
}

/// Validation and not-found failures carry their own message; infrastructure
/// failures surface only as a generic error.
fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::InvalidAppointmentDateTime
        | AppointmentError::InvalidDurationFormat(_)
        | AppointmentError::UnsupportedDurationUnit(_)
        | AppointmentError::InvalidExpireTimeCalculation => AppError::ValidationError(e.to_string()),
        AppointmentError::StylistNotFound
        | AppointmentError::ClientNotFound
        | AppointmentError::ServiceNotFound
        | AppointmentError::AppointmentNotFound => AppError::NotFound(e.to_string()),
        AppointmentError::OnlyUpcomingAppointmentsCanBeCancelled => AppError::Conflict(e.to_string()),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        AppointmentError::QueueError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let company_id = require_company(&user)?;

    if request.client_id.trim().is_empty() {
        return Err(AppError::BadRequest("client_id is required".to_string()));
    }

    let scheduled = state
        .booking
        .schedule_appointment(&company_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": scheduled.appointment,
            "expire_time": scheduled.expire_time_local,
            "time_input": scheduled.time_input,
            "payment_code": scheduled.payment_code,
            "message": "Appointment scheduled successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let company_id = require_company(&user)?;

    let appointments = state
        .booking
        .list_appointments(&company_id, &query)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len(),
        "limit": query.effective_limit(),
        "offset": query.effective_offset()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let company_id = require_company(&user)?;

    let appointment = state
        .booking
        .get_appointment(&company_id, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let company_id = require_company(&user)?;

    let appointment = state
        .booking
        .update_appointment(&company_id, appointment_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn trash_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let company_id = require_company(&user)?;

    let appointment = state
        .booking
        .trash_appointment(&company_id, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment moved to trash"
    })))
}

#[axum::debug_handler]
pub async fn restore_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let company_id = require_company(&user)?;

    let appointment = state
        .booking
        .restore_appointment(&company_id, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment restored"
    })))
}

/// Reconciles the caller's tenant without waiting for the next sweep tick. Admin only.
#[axum::debug_handler]
pub async fn reconcile_statuses(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let company_id = require_company(&user)?;

    let result = state
        .sweep
        .reconcile_tenant(&company_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "result": result
    })))
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>, AppError> {
    let company_id = require_company(&user)?;

    let notifications = state
        .booking
        .list_notifications(&company_id, query.limit.unwrap_or(AppointmentListQuery::DEFAULT_LIMIT))
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "notifications": notifications
    })))
}
