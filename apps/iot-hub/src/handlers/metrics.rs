//! Telemetry 指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iot_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            messages_received: snapshot.messages_received,
            discovery_messages: snapshot.discovery_messages,
            status_messages: snapshot.status_messages,
            data_messages: snapshot.data_messages,
            dropped_malformed: snapshot.dropped_malformed,
            dropped_unknown_device: snapshot.dropped_unknown_device,
            backpressure: snapshot.backpressure,
            resources_registered: snapshot.resources_registered,
            resources_removed: snapshot.resources_removed,
            devices_timed_out: snapshot.devices_timed_out,
            reservations_created: snapshot.reservations_created,
            reservations_rejected: snapshot.reservations_rejected,
            reservations_expired: snapshot.reservations_expired,
            commands_relayed: snapshot.commands_relayed,
            command_publish_failure: snapshot.command_publish_failure,
            reconnects: snapshot.reconnects,
        })),
    )
        .into_response()
}
