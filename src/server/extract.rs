use axum::extract::{ FromRequest, FromRequestParts };
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::Identity;
use super::error::ApiError;
use super::AppState;

/// JSON body whose rejections come back as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// The caller behind `Authorization: Bearer <token>`.
pub struct Caller(pub Identity);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| ApiError::Unauthorized("Token is missing".into()))?;
        let identity = state.auth.authenticate(token)?;
        Ok(Caller(identity))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts.headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
