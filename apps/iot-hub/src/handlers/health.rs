//! 健康检查。
//!
//! - GET /health

use api_contract::{ApiResponse, HealthDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;

pub async fn get_health(State(state): State<AppState>) -> Response {
    let dto = HealthDto {
        ok: true,
        storage: state.storage_backend.to_string(),
        mqtt_enabled: state.mqtt.is_some(),
        mqtt_state: state.mqtt.as_ref().map(|tracker| tracker.current().to_string()),
    };
    (StatusCode::OK, Json(ApiResponse::success(dto))).into_response()
}
