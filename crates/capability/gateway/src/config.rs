use rumqttc::{MqttOptions, QoS};
use std::time::Duration;

/// 消息代理连接参数。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 客户端 ID 前缀，实际 ID 追加随机后缀
    pub client_id: String,
    pub qos: u8,
    pub keep_alive_seconds: u64,
    /// 断线后固定的重连等待
    pub reconnect_delay_ms: u64,
    /// 连接存活检查周期；断线期间每次检查都会提前结束当前的重连等待，
    /// 因此实际重连间隔不超过 `reconnect_delay_ms` 与该周期中的较小者
    pub liveness_interval_ms: u64,
    /// 入站消息队列容量，队列满时丢弃新消息
    pub queue_capacity: usize,
    /// 客户端请求通道容量
    pub client_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "iot-hub".to_string(),
            qos: 0,
            keep_alive_seconds: 30,
            reconnect_delay_ms: 3000,
            liveness_interval_ms: 30_000,
            queue_capacity: 1024,
            client_capacity: 64,
        }
    }
}

impl GatewayConfig {
    pub fn mqtt_options(&self) -> MqttOptions {
        let client_id = format!("{}-{}", self.client_id, uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_seconds.max(5)));
        if let (Some(username), Some(password)) = (self.username.clone(), self.password.clone()) {
            options.set_credentials(username, password);
        }
        options
    }

    pub fn qos(&self) -> QoS {
        qos_from_u8(self.qos)
    }
}

pub fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}
