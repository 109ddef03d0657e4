// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AddBlackoutRequest, AppointmentFilter, ApproveAppointmentRequest, CreateAppointmentRequest,
    RejectAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::scheduler::SchedulingService;

pub type SchedulingState = Arc<SchedulingService>;

/// Caller identity placed in request extensions by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Auth("Authentication required".to_string()))
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

pub async fn get_available_slots(
    State(service): State<SchedulingState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = service.available_slots(query.date).await?;

    Ok(Json(json!({
        "date": query.date,
        "slots": slots,
        "total": slots.len()
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = service.create_appointment(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment requested"
        })),
    ))
}

pub async fn list_appointments(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.list_appointments(&user, filter).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_pending_queue(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let queue = service.pending_queue(&user).await?;

    Ok(Json(json!({
        "appointments": queue,
        "total": queue.len()
    })))
}

pub async fn get_appointment(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.get_appointment(appointment_id, &user).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Path(appointment_id): Path<Uuid>,
    Json(patch): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.update_appointment(appointment_id, &user, patch).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn approve_appointment(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<ApproveAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let appointment = service.approve(appointment_id, &user, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment approved"
    })))
}

pub async fn reject_appointment(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<RejectAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let appointment = service.reject(appointment_id, &user, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rejected"
    })))
}

pub async fn delete_appointment(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_appointment(appointment_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// BLACKOUT HANDLERS
// ==============================================================================

pub async fn list_blackouts(
    State(service): State<SchedulingState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Value>, AppError> {
    let blackouts = service.list_blackout_dates().await?;

    Ok(Json(json!({
        "blackouts": blackouts,
        "total": blackouts.len()
    })))
}

pub async fn add_blackout(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<AddBlackoutRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let outcome = service.add_blackout_date(&user, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "blackout": outcome.blackout,
            "cancelled_appointment_ids": outcome.cancelled_appointment_ids
        })),
    ))
}

pub async fn remove_blackout(
    State(service): State<SchedulingState>,
    CurrentUser(user): CurrentUser,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    let removed = service.remove_blackout_date(&user, date).await?;
    Ok(Json(json!({ "removed": removed })))
}
