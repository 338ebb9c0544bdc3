use axum::extract::{ Path, State };
use axum::http::StatusCode;
use axum::routing::{ get, put };
use axum::{ Json, Router };

use crate::models::EmergencyRequest;
use crate::records::{ CreateEmergencyRequest, UpdateEmergencyRequest };
use crate::server::error::ApiError;
use crate::server::extract::{ ApiJson, Caller };
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/emergency", get(list_emergencies).post(create_emergency))
        .route("/api/emergency/", get(list_emergencies).post(create_emergency))
        .route("/api/emergency/{id}", put(update_emergency))
}

async fn create_emergency(
    State(state): State<AppState>,
    Caller(identity): Caller,
    ApiJson(req): ApiJson<CreateEmergencyRequest>
) -> Result<(StatusCode, Json<EmergencyRequest>), ApiError> {
    let emergency = state.emergencies.create(&identity, req).await?;
    Ok((StatusCode::CREATED, Json(emergency)))
}

async fn list_emergencies(
    State(state): State<AppState>,
    Caller(identity): Caller
) -> Result<Json<Vec<EmergencyRequest>>, ApiError> {
    Ok(Json(state.emergencies.list(&identity).await?))
}

async fn update_emergency(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateEmergencyRequest>
) -> Result<Json<EmergencyRequest>, ApiError> {
    Ok(Json(state.emergencies.update(&identity, &id, req).await?))
}
