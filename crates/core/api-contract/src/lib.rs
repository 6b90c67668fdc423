//! 稳定的运维 DTO 与 API 响应契约。

use serde::Serialize;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 健康检查响应体。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub ok: bool,
    /// `memory` 或 `postgres`
    pub storage: String,
    pub mqtt_enabled: bool,
    /// 未启用 MQTT 时为 `None`。
    pub mqtt_state: Option<String>,
}

/// 进程内计数器快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub messages_received: u64,
    pub discovery_messages: u64,
    pub status_messages: u64,
    pub data_messages: u64,
    pub dropped_malformed: u64,
    pub dropped_unknown_device: u64,
    pub backpressure: u64,
    pub resources_registered: u64,
    pub resources_removed: u64,
    pub devices_timed_out: u64,
    pub reservations_created: u64,
    pub reservations_rejected: u64,
    pub reservations_expired: u64,
    pub commands_relayed: u64,
    pub command_publish_failure: u64,
    pub reconnects: u64,
}
