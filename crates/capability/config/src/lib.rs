//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未设置时使用内存存储
    pub database_url: Option<String>,
    pub mqtt_enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_client_id: String,
    pub mqtt_qos: u8,
    pub mqtt_keep_alive_seconds: u64,
    pub mqtt_reconnect_delay_ms: u64,
    pub mqtt_liveness_interval_seconds: u64,
    pub inbound_queue_capacity: usize,
    /// 发现报文未携带部门令牌时是否归入默认部门
    pub default_department_fallback: bool,
    pub default_department_token: String,
    pub max_value_bytes: usize,
    pub max_value_series: usize,
    pub fire_resource_events: bool,
    pub event_ttl_ms: u64,
    pub ping_timeout_seconds: u64,
    pub ping_check_interval_seconds: u64,
    pub reservation_cleanup_interval_seconds: u64,
    pub reservation_grace_ms: u64,
    pub publish_max_retries: u64,
    pub publish_backoff_ms: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("IOT_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("IOT_DATABASE_URL");
        let mqtt_enabled = read_bool_with_default("IOT_MQTT", true);
        let mqtt_host = env::var("IOT_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("IOT_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("IOT_MQTT_USERNAME");
        let mqtt_password = read_optional("IOT_MQTT_PASSWORD");
        let mqtt_client_id =
            env::var("IOT_MQTT_CLIENT_ID").unwrap_or_else(|_| "iot-hub".to_string());
        let mqtt_qos = read_u8_with_default("IOT_MQTT_QOS", 0)?;
        let mqtt_keep_alive_seconds = read_u64_with_default("IOT_MQTT_KEEP_ALIVE_SECONDS", 30)?;
        let mqtt_reconnect_delay_ms = read_u64_with_default("IOT_MQTT_RECONNECT_DELAY_MS", 3000)?;
        let mqtt_liveness_interval_seconds =
            read_u64_with_default("IOT_MQTT_LIVENESS_INTERVAL_SECONDS", 30)?;
        let inbound_queue_capacity =
            read_u64_with_default("IOT_INBOUND_QUEUE_CAPACITY", 1024)? as usize;
        let default_department_fallback =
            read_bool_with_default("IOT_DEFAULT_DEPARTMENT_FALLBACK", false);
        let default_department_token = env::var("IOT_DEFAULT_DEPARTMENT_TOKEN")
            .unwrap_or_else(|_| "default".to_string());
        let max_value_bytes = read_u64_with_default("IOT_MAX_VALUE_BYTES", 4096)? as usize;
        let max_value_series = read_u64_with_default("IOT_MAX_VALUE_SERIES", 16)? as usize;
        let fire_resource_events = read_bool_with_default("IOT_FIRE_RESOURCE_EVENTS", true);
        let event_ttl_ms = read_u64_with_default("IOT_EVENT_TTL_MS", 120_000)?;
        let ping_timeout_seconds = read_u64_with_default("IOT_PING_TIMEOUT_SECONDS", 60)?;
        let ping_check_interval_seconds =
            read_u64_with_default("IOT_PING_CHECK_INTERVAL_SECONDS", 30)?;
        let reservation_cleanup_interval_seconds =
            read_u64_with_default("IOT_RESERVATION_CLEANUP_INTERVAL_SECONDS", 300)?;
        let reservation_grace_ms = read_u64_with_default("IOT_RESERVATION_GRACE_MS", 10_000)?;
        let publish_max_retries = read_u64_with_default("IOT_PUBLISH_MAX_RETRIES", 2)?;
        let publish_backoff_ms = read_u64_with_default("IOT_PUBLISH_BACKOFF_MS", 200)?;

        Ok(Self {
            http_addr,
            database_url,
            mqtt_enabled,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_client_id,
            mqtt_qos,
            mqtt_keep_alive_seconds,
            mqtt_reconnect_delay_ms,
            mqtt_liveness_interval_seconds,
            inbound_queue_capacity,
            default_department_fallback,
            default_department_token,
            max_value_bytes,
            max_value_series,
            fire_resource_events,
            event_ttl_ms,
            ping_timeout_seconds,
            ping_check_interval_seconds,
            reservation_cleanup_interval_seconds,
            reservation_grace_ms,
            publish_max_retries,
            publish_backoff_ms,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
