pub mod models;
pub mod predict;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::SignalError;

/// Error body is always `{"detail": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<SignalError> for ApiError {
    fn from(e: SignalError) -> Self {
        let status = match e {
            SignalError::UnsupportedAsset(_) | SignalError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

/// Malformed or incomplete bodies keep axum's status (422 for a missing
/// field, 400 for bad syntax) but use the same JSON error shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::artifact::save_pair;
    use crate::pipeline::{LABEL_DOWN, LABEL_UP};
    use crate::prediction::tests::{constant_pair, StaticSource};
    use crate::registry::ModelRegistry;
    use crate::{app, config::Settings, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use market_data::Asset;
    use serde_json::Value;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_with(models_dir: &Path, candles: usize) -> Arc<AppState> {
        let mut settings = Settings::default();
        settings.models_dir = models_dir.to_path_buf();
        let (registry, _) = ModelRegistry::load_all(models_dir);
        Arc::new(AppState::new(
            settings,
            registry,
            Arc::new(StaticSource::rising(candles)),
        ))
    }

    fn write_model(dir: &Path, name: &str, label: u32) {
        let asset = Asset::parse(name).unwrap();
        let (artifact, scaler) = constant_pair(&asset, label);
        save_pair(dir, &asset, &artifact, &scaler).unwrap();
    }

    async fn call(state: Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
        let response = app(state).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn predict_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_lists_assets() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "EURUSD", LABEL_UP);
        let req = Request::get("/health").body(Body::empty()).unwrap();

        let (status, body) = call(state_with(dir.path(), 60), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(
            body["supported_assets"],
            serde_json::json!(["EURUSD", "GBPUSD", "USDJPY", "BTCUSD"])
        );
        assert_eq!(body["loaded_models"], serde_json::json!(["EURUSD"]));
    }

    #[tokio::test]
    async fn test_predict_success() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "BTCUSD", LABEL_DOWN);
        let state = state_with(dir.path(), 60);

        let (status, body) = call(state.clone(), predict_request(r#"{"asset":"btcusd"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["asset"], "BTCUSD");
        assert_eq!(body["signal"], "DOWN");
        assert_eq!(body["prob_up"], 0.0);
        assert_eq!(body["prob_down"], 1.0);
        assert!(body["explanation"]
            .as_str()
            .unwrap()
            .starts_with("Model indicates DOWN signal"));
        assert_eq!(
            state.metrics.get_counter(crate::observability::metrics::PREDICTIONS_DOWN).await,
            1
        );
    }

    #[tokio::test]
    async fn test_predict_unsupported_asset_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(
            state_with(dir.path(), 60),
            predict_request(r#"{"asset":"xauusd","horizon_hours":48}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unsupported asset: XAUUSD");
    }

    #[tokio::test]
    async fn test_predict_missing_asset_is_json_422() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(state_with(dir.path(), 60), predict_request(r#"{"horizon_hours":24}"#)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("asset"));
    }

    #[tokio::test]
    async fn test_predict_malformed_body_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(state_with(dir.path(), 60), predict_request("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_predict_null_horizon_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "EURUSD", LABEL_UP);
        let (status, body) = call(
            state_with(dir.path(), 60),
            predict_request(r#"{"asset":"EURUSD","horizon_hours":null}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signal"], "UP");
    }

    #[tokio::test]
    async fn test_predict_without_model_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(state_with(dir.path(), 60), predict_request(r#"{"asset":"GBPUSD"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "No model loaded for asset: GBPUSD");
    }

    #[tokio::test]
    async fn test_predict_with_short_history_is_500() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "USDJPY", LABEL_UP);
        let (status, body) = call(state_with(dir.path(), 5), predict_request(r#"{"asset":"USDJPY"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("Not enough price history"));
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_models() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), 60);

        let req = Request::get("/models").body(Body::empty()).unwrap();
        let (_, body) = call(state.clone(), req).await;
        assert_eq!(body, serde_json::json!([]));

        write_model(dir.path(), "GBPUSD", LABEL_UP);
        let req = Request::post("/models/reload").body(Body::empty()).unwrap();
        let (status, body) = call(state.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], serde_json::json!(["GBPUSD"]));
        assert_eq!(body["missing"].as_array().unwrap().len(), 3);

        let req = Request::get("/models").body(Body::empty()).unwrap();
        let (_, body) = call(state, req).await;
        assert_eq!(body[0]["asset"], "GBPUSD");
        assert_eq!(body[0]["n_trees"], 3);
    }

    #[tokio::test]
    async fn test_health_detail_reports_gauges() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "EURUSD", LABEL_UP);
        write_model(dir.path(), "BTCUSD", LABEL_DOWN);
        let state = state_with(dir.path(), 60);

        let req = Request::post("/models/reload").body(Body::empty()).unwrap();
        call(state.clone(), req).await;

        let req = Request::get("/health/detail").body(Body::empty()).unwrap();
        let (status, body) = call(state, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["metrics"]["gauges"]["loaded_models"], 2.0);
        assert_eq!(body["metrics"]["counters"]["model_reloads_total"], 1);
    }
}
