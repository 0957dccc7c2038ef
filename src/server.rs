//! HTTP surface: health message and single-record prediction

use crate::error::AppError;
use crate::metrics::PredictionMetrics;
use crate::models::InferenceEngine;
use crate::types::{PredictionResponse, TouristRecord};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Log a milestone every this many predictions
const MILESTONE_EVERY: u64 = 100;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<PredictionMetrics>,
}

impl AppState {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            metrics: Arc::new(PredictionMetrics::new()),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Tourist Anomaly Detector API is running" }))
}

async fn predict(
    State(state): State<AppState>,
    Json(record): Json<TouristRecord>,
) -> Result<Json<PredictionResponse>, AppError> {
    let started = Instant::now();
    let result = state.engine.predict(&record)?;
    let elapsed = started.elapsed();

    let count = state.metrics.record(
        result.label,
        result.model_votes.iter().map(|(name, vote)| (name.as_str(), *vote)),
        elapsed,
    );

    debug!(
        prediction = %result.label,
        agreement = result.agreement,
        latency_us = elapsed.as_micros() as u64,
        "Prediction served"
    );

    if count % MILESTONE_EVERY == 0 {
        info!(
            predictions = count,
            anomaly_rate = format!("{:.1}%", state.metrics.anomaly_rate() * 100.0),
            avg_agreement = format!("{:.2}", state.metrics.avg_agreement()),
            avg_latency_us = state.metrics.mean_latency_us(),
            "Prediction milestone"
        );
    }

    Ok(Json(PredictionResponse {
        prediction: result.label,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorsConfig;
    use crate::models::pipeline::test_support::{calm_tourists, stranded_tourist};
    use crate::models::{AnomalyPipeline, ModelArtifact};
    use crate::types::Label;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn state() -> AppState {
        let mut detectors = DetectorsConfig::default();
        detectors.isolation_forest.n_estimators = 40;
        let records = calm_tourists(150, 3);

        let mut pipeline = AnomalyPipeline::from_config(&detectors);
        pipeline.fit(&records).unwrap();
        AppState::new(InferenceEngine::new(ModelArtifact::new(
            pipeline,
            records.len(),
        )))
    }

    fn predict_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_message() {
        let response = app(state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Tourist Anomaly Detector API is running" })
        );
    }

    #[tokio::test]
    async fn test_predict_flags_stranded_tourist() {
        let state = state();
        let body = serde_json::to_string(&stranded_tourist()).unwrap();

        let response = app(state.clone())
            .oneshot(predict_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "prediction": "Anomaly" }));
        assert_eq!(state.metrics.predictions.load(Ordering::Relaxed), 1);
        assert_eq!(state.metrics.anomalies.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_predict_is_deterministic() {
        let state = state();
        let body = serde_json::to_string(&TouristRecord::distress_example()).unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = app(state.clone())
                .oneshot(predict_request(body.clone()))
                .await
                .unwrap();
            let value = body_json(response).await;
            let label: Label = serde_json::from_value(value["prediction"].clone()).unwrap();
            seen.push(label);
        }
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let response = app(state())
            .oneshot(predict_request("{\"latitude\": \"north\"}".to_string()))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_missing_content_type_rejected() {
        let body = serde_json::to_string(&TouristRecord::default()).unwrap();
        let response = app(state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/predict")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
