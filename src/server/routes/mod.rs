pub mod appointments;
pub mod auth;
pub mod chat;
pub mod emergency;
pub mod predict;

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{ Request, Response };
    use axum::Router;
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::{ json, Value };
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::{ PasswordHasher, TokenService };
    use crate::server::{ router, AppState };
    use crate::store::MemoryStore;
    use crate::triage::test_support::predictor;

    pub fn app() -> Router {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TokenService::new(Some("test-secret".into()), Duration::hours(1))),
            PasswordHasher::new(1_000),
            Arc::new(predictor())
        );
        router(state)
    }

    pub fn make_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {}", t));
        }
        match body {
            Some(json) =>
                builder
                    .header("Content-Type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(app: &Router, req: Request<Body>) -> (u16, Value) {
        let response: Response<Body> = app.clone().oneshot(req).await.unwrap();
        let status = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Registers an account and returns its access token.
    pub async fn register(app: &Router, email: &str, role: &str) -> String {
        let (status, body) = send(
            app,
            make_request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "secret123",
                    "name": "Test User",
                    "role": role,
                }))
            )
        ).await;
        assert_eq!(status, 201, "{}", body);
        body["access_token"].as_str().unwrap().to_string()
    }
}
