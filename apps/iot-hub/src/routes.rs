//! 路由定义
//!
//! - 健康检查：/health
//! - 指标快照：/metrics

use crate::AppState;
use crate::handlers::{get_health, get_metrics};
use crate::middleware::request_context;
use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use iot_gateway::ConnectionTracker;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes: Bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_reports_mqtt_state() {
        let app = create_router(AppState {
            storage_backend: "memory",
            mqtt: Some(ConnectionTracker::new()),
        });
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-trace-id"));

        let value = body_json(response).await;
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["storage"], "memory");
        assert_eq!(value["data"]["mqttEnabled"], true);
        assert_eq!(value["data"]["mqttState"], "disconnected");
    }

    #[tokio::test]
    async fn metrics_returns_counter_snapshot() {
        iot_telemetry::record_message_received();
        let app = create_router(AppState {
            storage_backend: "memory",
            mqtt: None,
        });
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let value = body_json(response).await;
        assert!(value["data"]["messagesReceived"].as_u64().expect("counter") >= 1);
        assert!(value["data"].get("reservationsCreated").is_some());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = create_router(AppState {
            storage_backend: "memory",
            mqtt: None,
        });
        let response = app
            .oneshot(Request::builder().uri("/resources").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
