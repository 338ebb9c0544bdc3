use axum::extract::State;
use axum::routing::post;
use axum::{ Json, Router };
use log::debug;
use serde::Deserialize;

use crate::server::error::ApiError;
use crate::server::extract::ApiJson;
use crate::server::AppState;
use crate::triage::Prediction;

#[derive(Debug, Deserialize)]
struct PredictRequest {
    symptoms: Option<String>,
    /// Free text from the patient. Logged only.
    additional_info: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/predict", post(predict)).route("/api/predict", post(predict))
}

async fn predict(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PredictRequest>
) -> Result<Json<Prediction>, ApiError> {
    let symptoms = req.symptoms.ok_or_else(|| {
        ApiError::BadRequest("No symptoms provided in request".into())
    })?;
    if symptoms.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty symptoms string provided".into()));
    }
    if let Some(info) = req.additional_info.as_deref().filter(|i| !i.trim().is_empty()) {
        debug!("Prediction request carries additional info: {}", info);
    }

    Ok(Json(state.predictor.predict(&symptoms)?))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ app, make_request, send };
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;

    #[tokio::test]
    async fn predict_returns_disease_and_reference_text() {
        let app = app();
        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/predict",
                None,
                Some(json!({ "symptoms": "itching, skin rash", "additional_info": "two weeks" }))
            )
        ).await;
        assert_eq!(status, 200, "{}", body);
        assert_eq!(body["predicted_disease"], "Fungal infection");
        assert_eq!(body["medications"], json!(["Antifungal cream"]));
    }

    #[tokio::test]
    async fn predict_rejects_non_json_bodies() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header("Content-Type", "text/plain")
            .body(Body::from("itching"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 415);
        assert_eq!(body["error"], "Content-Type must be application/json");
    }

    #[tokio::test]
    async fn predict_input_errors_are_bad_requests() {
        let app = app();
        for (payload, message) in [
            (json!({}), "No symptoms provided in request"),
            (json!({ "symptoms": "   " }), "Empty symptoms string provided"),
            (json!({ "symptoms": " , ," }), "No valid symptoms provided"),
            (json!({ "symptoms": "broken leg" }), "Could not predict disease from provided symptoms"),
        ] {
            let (status, body) = send(&app, make_request("POST", "/predict", None, Some(payload))).await;
            assert_eq!(status, 400);
            assert_eq!(body["error"], message);
        }

        let (status, _) = send(
            &app,
            make_request("POST", "/predict", None, Some(json!({ "symptoms": 42 })))
        ).await;
        assert_eq!(status, 400);
    }
}
