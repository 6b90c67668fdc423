//! 追踪、计数指标与请求 ID 生成。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
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

/// 进程级计数指标。
pub struct TelemetryMetrics {
    messages_received: AtomicU64,
    discovery_messages: AtomicU64,
    status_messages: AtomicU64,
    data_messages: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_unknown_device: AtomicU64,
    backpressure: AtomicU64,
    resources_registered: AtomicU64,
    resources_removed: AtomicU64,
    devices_timed_out: AtomicU64,
    reservations_created: AtomicU64,
    reservations_rejected: AtomicU64,
    reservations_expired: AtomicU64,
    commands_relayed: AtomicU64,
    command_publish_failure: AtomicU64,
    reconnects: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            discovery_messages: AtomicU64::new(0),
            status_messages: AtomicU64::new(0),
            data_messages: AtomicU64::new(0),
            dropped_malformed: AtomicU64::new(0),
            dropped_unknown_device: AtomicU64::new(0),
            backpressure: AtomicU64::new(0),
            resources_registered: AtomicU64::new(0),
            resources_removed: AtomicU64::new(0),
            devices_timed_out: AtomicU64::new(0),
            reservations_created: AtomicU64::new(0),
            reservations_rejected: AtomicU64::new(0),
            reservations_expired: AtomicU64::new(0),
            commands_relayed: AtomicU64::new(0),
            command_publish_failure: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            discovery_messages: self.discovery_messages.load(Ordering::Relaxed),
            status_messages: self.status_messages.load(Ordering::Relaxed),
            data_messages: self.data_messages.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_unknown_device: self.dropped_unknown_device.load(Ordering::Relaxed),
            backpressure: self.backpressure.load(Ordering::Relaxed),
            resources_registered: self.resources_registered.load(Ordering::Relaxed),
            resources_removed: self.resources_removed.load(Ordering::Relaxed),
            devices_timed_out: self.devices_timed_out.load(Ordering::Relaxed),
            reservations_created: self.reservations_created.load(Ordering::Relaxed),
            reservations_rejected: self.reservations_rejected.load(Ordering::Relaxed),
            reservations_expired: self.reservations_expired.load(Ordering::Relaxed),
            commands_relayed: self.commands_relayed.load(Ordering::Relaxed),
            command_publish_failure: self.command_publish_failure.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录入站消息次数。
pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录发现报文次数。
pub fn record_discovery_message() {
    metrics().discovery_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录状态指令次数。
pub fn record_status_message() {
    metrics().status_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录数据上报次数。
pub fn record_data_message() {
    metrics().data_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录非法报文丢弃次数。
pub fn record_dropped_malformed() {
    metrics().dropped_malformed.fetch_add(1, Ordering::Relaxed);
}

/// 记录未知设备丢弃次数。
pub fn record_dropped_unknown_device() {
    metrics()
        .dropped_unknown_device
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录入站队列满丢弃次数。
pub fn record_backpressure() {
    metrics().backpressure.fetch_add(1, Ordering::Relaxed);
}

/// 记录新注册资源次数。
pub fn record_resource_registered() {
    metrics()
        .resources_registered
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录资源删除次数。
pub fn record_resource_removed() {
    metrics().resources_removed.fetch_add(1, Ordering::Relaxed);
}

/// 记录心跳超时下线次数。
pub fn record_device_timed_out() {
    metrics().devices_timed_out.fetch_add(1, Ordering::Relaxed);
}

/// 记录预约成功次数。
pub fn record_reservation_created() {
    metrics()
        .reservations_created
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录预约因无空闲槽位被拒次数。
pub fn record_reservation_rejected() {
    metrics()
        .reservations_rejected
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录过期预约清理数量。
pub fn record_reservations_expired(count: u64) {
    metrics()
        .reservations_expired
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录命令下发成功次数。
pub fn record_command_relayed() {
    metrics().commands_relayed.fetch_add(1, Ordering::Relaxed);
}

/// 记录命令发布失败次数（重试耗尽）。
pub fn record_command_publish_failure() {
    metrics()
        .command_publish_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录重连次数。
pub fn record_reconnect() {
    metrics().reconnects.fetch_add(1, Ordering::Relaxed);
}
