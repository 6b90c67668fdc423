/// 消息代理投递的原始消息。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at_ms: i64,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at_ms: now_epoch_ms(),
        }
    }

    /// 以 UTF-8 文本读取 payload（非法字节替换）。
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// 预约时间窗口 `[from_ms, until_ms)`，单位毫秒。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from_ms: i64,
    pub until_ms: i64,
}

impl TimeWindow {
    pub fn new(from_ms: i64, until_ms: i64) -> Self {
        Self { from_ms, until_ms }
    }

    pub fn is_valid(&self) -> bool {
        self.until_ms > self.from_ms
    }

    /// 两个窗口是否重叠。
    ///
    /// 仅当一方起点严格晚于另一方终点，或一方终点严格早于另一方起点时才不重叠；
    /// 端点相接（`[10, 11)` 与 `[11, 12)`）按重叠处理。
    pub fn intersects(&self, other: &TimeWindow) -> bool {
        self.from_ms <= other.until_ms && self.until_ms >= other.from_ms
    }

    /// 窗口是否已完全结束。
    pub fn has_elapsed(&self, now_ms: i64) -> bool {
        self.until_ms < now_ms
    }
}

/// 当前 Unix 时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
