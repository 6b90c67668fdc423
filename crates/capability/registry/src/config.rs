/// 注册表参数。
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// 单个数值序列编码后的字节上限
    pub max_value_bytes: usize,
    /// 单个资源最多保存的数值序列个数
    pub max_value_series: usize,
    /// 是否发出资源变更事件
    pub fire_events: bool,
    pub event_ttl_ms: u64,
    /// 超过该时长未收到心跳的在线设备被置为离线
    pub ping_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_value_bytes: 4096,
            max_value_series: 16,
            fire_events: true,
            event_ttl_ms: 120_000,
            ping_timeout_ms: 60_000,
        }
    }
}

impl RegistryConfig {
    pub(crate) fn sanitized(mut self) -> Self {
        if self.max_value_bytes == 0 {
            self.max_value_bytes = 1;
        }
        if self.max_value_series == 0 {
            self.max_value_series = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_keeps_at_least_one_series() {
        let config = RegistryConfig {
            max_value_bytes: 0,
            max_value_series: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.max_value_bytes, 1);
        assert_eq!(config.max_value_series, 1);
    }
}
