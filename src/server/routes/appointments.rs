use axum::extract::{ Path, Query, State };
use axum::http::StatusCode;
use axum::routing::{ get, put };
use axum::{ Json, Router };

use crate::models::Appointment;
use crate::records::{
    AppointmentStats,
    CreateAppointmentRequest,
    ScheduleQuery,
    StatusUpdateRequest,
    UpdateAppointmentRequest,
};
use crate::server::error::ApiError;
use crate::server::extract::{ ApiJson, Caller };
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/appointments", get(list_appointments).post(create_appointment))
        .route("/api/appointments/", get(list_appointments).post(create_appointment))
        .route("/api/appointments/stats", get(appointment_stats))
        .route("/api/appointments/doctor", get(doctor_schedule))
        .route("/api/appointments/{id}", get(get_appointment).put(update_appointment))
        .route("/api/appointments/{id}/status", put(update_status))
}

async fn create_appointment(
    State(state): State<AppState>,
    Caller(identity): Caller,
    ApiJson(req): ApiJson<CreateAppointmentRequest>
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = state.appointments.create(&identity, req).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn list_appointments(
    State(state): State<AppState>,
    Caller(identity): Caller
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.list(&identity).await?))
}

async fn appointment_stats(
    State(state): State<AppState>,
    Caller(identity): Caller
) -> Result<Json<AppointmentStats>, ApiError> {
    Ok(Json(state.appointments.stats(&identity).await?))
}

async fn doctor_schedule(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Query(query): Query<ScheduleQuery>
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.schedule(&identity, query).await?))
}

async fn get_appointment(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(state.appointments.get(&identity, &id).await?))
}

async fn update_appointment(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateAppointmentRequest>
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(state.appointments.update(&identity, &id, req).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdateRequest>
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(state.appointments.update_status(&identity, &id, req).await?))
}
