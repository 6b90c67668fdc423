//! 资源变更事件。
//!
//! 事件是同步、非阻塞、不可失败的通知：注册表不关心是否有人接收。

use tokio::sync::broadcast;
use tracing::debug;

/// 资源属性变更。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEvent {
    pub resource_id: String,
    pub property: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub ttl_ms: u64,
    pub ts_ms: i64,
}

/// 事件通知接口。
pub trait EventNotifier: Send + Sync {
    fn raise_event(&self, event: ResourceEvent);
}

/// 丢弃所有事件。
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl EventNotifier for NoopNotifier {
    fn raise_event(&self, _event: ResourceEvent) {}
}

/// 以 debug 日志输出事件。
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl EventNotifier for TracingNotifier {
    fn raise_event(&self, event: ResourceEvent) {
        debug!(
            target: "iot.registry",
            resource_id = %event.resource_id,
            property = %event.property,
            old_value = ?event.old_value,
            new_value = ?event.new_value,
            ttl_ms = event.ttl_ms,
            "resource_event"
        );
    }
}

/// 基于 broadcast 通道的通知器，没有订阅者时事件被丢弃。
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ResourceEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.sender.subscribe()
    }
}

impl EventNotifier for BroadcastNotifier {
    fn raise_event(&self, event: ResourceEvent) {
        let _ = self.sender.send(event);
    }
}
