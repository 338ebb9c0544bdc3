use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use log::error;
use serde_json::json;

use crate::auth::{ AuthError, TokenError };
use crate::chat::ChatError;
use crate::records::RecordError;
use crate::store::StoreError;
use crate::triage::TriageError;

/// Every handler failure ends up here and leaves as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::UnsupportedMediaType("Content-Type must be application/json".into())
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StoreError::Conflict(_) => ApiError::Conflict("Session was modified concurrently".into()),
            StoreError::Duplicate(what) => ApiError::BadRequest(format!("{} already exists", what)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => ApiError::Internal(err.to_string()),
            TokenError::Expired => ApiError::Unauthorized("Token has expired".into()),
            _ => ApiError::Unauthorized("Invalid token".into()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::DuplicateEmail => ApiError::BadRequest(err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::InvalidPassword => ApiError::Unauthorized(err.to_string()),
            AuthError::Token(e) => e.into(),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NoActiveSession | ChatError::EmptyMessage => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::Store(e) => e.into(),
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation(msg) => ApiError::BadRequest(msg),
            RecordError::Forbidden(msg) => ApiError::Forbidden(msg),
            RecordError::NotFound(msg) => ApiError::NotFound(msg),
            RecordError::Store(e) => e.into(),
        }
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::EmptyInput | TriageError::NoMatch { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            TriageError::Classifier(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (AuthError::DuplicateEmail.into(), StatusCode::BAD_REQUEST),
            (AuthError::UserNotFound.into(), StatusCode::NOT_FOUND),
            (AuthError::InvalidPassword.into(), StatusCode::UNAUTHORIZED),
            (AuthError::Token(TokenError::Expired).into(), StatusCode::UNAUTHORIZED),
            (TokenError::MissingSecret.into(), StatusCode::INTERNAL_SERVER_ERROR),
            (RecordError::Forbidden("no".into()).into(), StatusCode::FORBIDDEN),
            (StoreError::Conflict("chat session s1".into()).into(), StatusCode::CONFLICT),
            (
                TriageError::NoMatch { unmatched: vec!["time travel".into()] }.into(),
                StatusCode::BAD_REQUEST,
            ),
            (ChatError::NoActiveSession.into(), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{:?}", err);
        }
    }
}
