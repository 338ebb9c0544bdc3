use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{ get, post, put };
use axum::{ Json, Router };
use serde_json::{ json, Value };

use crate::auth::{ AuthSession, ChangePasswordRequest, LoginRequest, RegisterRequest };
use crate::server::error::ApiError;
use crate::server::extract::{ ApiJson, Caller };
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/signup", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(profile))
        .route("/api/auth/verify-token", get(profile))
        .route("/api/auth/profile", get(profile))
        .route("/api/auth/password", put(change_password))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let session = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>
) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(state.auth.login(req).await?))
}

async fn profile(
    State(state): State<AppState>,
    Caller(identity): Caller
) -> Result<Json<Value>, ApiError> {
    let user = state.auth.profile(&identity).await?;
    Ok(Json(json!({ "user": user })))
}

async fn change_password(
    State(state): State<AppState>,
    Caller(identity): Caller,
    ApiJson(req): ApiJson<ChangePasswordRequest>
) -> Result<Json<Value>, ApiError> {
    state.auth.change_password(&identity, req).await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}
