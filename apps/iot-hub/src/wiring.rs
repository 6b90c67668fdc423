//! 运行配置到各能力模块参数的映射与存储装配。

use iot_config::AppConfig;
use iot_gateway::{GatewayConfig, RouterOptions};
use iot_registry::RegistryConfig;
use iot_relay::RelayConfig;
use iot_reservation::ReservationConfig;
use iot_storage::{
    AuditLogStore, DepartmentDirectory, InMemoryAuditLogStore, InMemoryDepartmentDirectory,
    InMemoryReservationStore, InMemoryResourceStore, PgAuditLogStore, PgDepartmentDirectory,
    PgReservationStore, PgResourceStore, ReservationStore, ResourceStore, StorageError,
    connect_pool, ensure_schema,
};
use std::sync::Arc;
use std::time::Duration;

/// 服务使用的全部存储。
#[derive(Clone)]
pub struct Stores {
    pub backend: &'static str,
    pub resources: Arc<dyn ResourceStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub departments: Arc<dyn DepartmentDirectory>,
    pub audit: Arc<dyn AuditLogStore>,
}

impl Stores {
    /// 内存存储，预置默认部门。
    pub fn in_memory() -> Self {
        Self {
            backend: "memory",
            resources: Arc::new(InMemoryResourceStore::new()),
            reservations: Arc::new(InMemoryReservationStore::new()),
            departments: Arc::new(InMemoryDepartmentDirectory::with_default_department()),
            audit: Arc::new(InMemoryAuditLogStore::new()),
        }
    }

    /// 配置了数据库地址时连接 Postgres 并执行建表脚本，否则使用内存存储。
    pub async fn from_config(config: &AppConfig) -> Result<Self, StorageError> {
        let Some(database_url) = config.database_url.as_deref() else {
            return Ok(Self::in_memory());
        };
        let pool = connect_pool(database_url).await?;
        ensure_schema(&pool).await?;
        Ok(Self {
            backend: "postgres",
            resources: Arc::new(PgResourceStore::new(pool.clone())),
            reservations: Arc::new(PgReservationStore::new(pool.clone())),
            departments: Arc::new(PgDepartmentDirectory::new(pool.clone())),
            audit: Arc::new(PgAuditLogStore::new(pool)),
        })
    }
}

pub fn registry_config(config: &AppConfig) -> RegistryConfig {
    RegistryConfig {
        max_value_bytes: config.max_value_bytes,
        max_value_series: config.max_value_series,
        fire_events: config.fire_resource_events,
        event_ttl_ms: config.event_ttl_ms,
        ping_timeout_ms: config.ping_timeout_seconds.saturating_mul(1000),
    }
}

pub fn reservation_config(config: &AppConfig) -> ReservationConfig {
    ReservationConfig {
        active_grace_ms: i64::try_from(config.reservation_grace_ms).unwrap_or(i64::MAX),
    }
}

pub fn relay_config(config: &AppConfig) -> RelayConfig {
    RelayConfig {
        publish_max_retries: config.publish_max_retries,
        publish_backoff_ms: config.publish_backoff_ms,
    }
}

pub fn gateway_config(config: &AppConfig) -> GatewayConfig {
    GatewayConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        client_id: config.mqtt_client_id.clone(),
        qos: config.mqtt_qos,
        keep_alive_seconds: config.mqtt_keep_alive_seconds,
        reconnect_delay_ms: config.mqtt_reconnect_delay_ms,
        liveness_interval_ms: config.mqtt_liveness_interval_seconds.saturating_mul(1000),
        queue_capacity: config.inbound_queue_capacity,
        ..GatewayConfig::default()
    }
}

pub fn router_options(config: &AppConfig) -> RouterOptions {
    RouterOptions {
        default_department_token: config
            .default_department_fallback
            .then(|| config.default_department_token.clone()),
    }
}

pub fn ping_check_interval(config: &AppConfig) -> Duration {
    Duration::from_secs(config.ping_check_interval_seconds.max(1))
}

pub fn cleanup_interval(config: &AppConfig) -> Duration {
    Duration::from_secs(config.reservation_cleanup_interval_seconds.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AppConfig {
        AppConfig {
            http_addr: "127.0.0.1:0".to_string(),
            database_url: None,
            mqtt_enabled: false,
            mqtt_host: "broker".to_string(),
            mqtt_port: 1884,
            mqtt_username: None,
            mqtt_password: None,
            mqtt_client_id: "hub-test".to_string(),
            mqtt_qos: 1,
            mqtt_keep_alive_seconds: 20,
            mqtt_reconnect_delay_ms: 500,
            mqtt_liveness_interval_seconds: 2,
            inbound_queue_capacity: 8,
            default_department_fallback: false,
            default_department_token: "default".to_string(),
            max_value_bytes: 128,
            max_value_series: 4,
            fire_resource_events: false,
            event_ttl_ms: 1000,
            ping_timeout_seconds: 90,
            ping_check_interval_seconds: 0,
            reservation_cleanup_interval_seconds: 60,
            reservation_grace_ms: 2500,
            publish_max_retries: 1,
            publish_backoff_ms: 10,
        }
    }

    #[tokio::test]
    async fn missing_database_url_uses_memory() {
        let stores = Stores::from_config(&sample_config()).await.expect("stores");
        assert_eq!(stores.backend, "memory");
        assert!(
            stores
                .departments
                .find_by_token("default")
                .await
                .expect("lookup")
                .is_some()
        );
    }

    #[test]
    fn fallback_token_only_when_enabled() {
        let mut config = sample_config();
        assert!(router_options(&config).default_department_token.is_none());
        config.default_department_fallback = true;
        assert_eq!(
            router_options(&config).default_department_token.as_deref(),
            Some("default")
        );
    }

    #[test]
    fn maps_component_settings() {
        let config = sample_config();
        let registry = registry_config(&config);
        assert_eq!(registry.ping_timeout_ms, 90_000);
        assert_eq!(registry.max_value_series, 4);
        assert!(!registry.fire_events);

        let gateway = gateway_config(&config);
        assert_eq!(gateway.port, 1884);
        assert_eq!(gateway.liveness_interval_ms, 2000);
        assert_eq!(gateway.queue_capacity, 8);

        assert_eq!(reservation_config(&config).active_grace_ms, 2500);
        assert_eq!(relay_config(&config).publish_max_retries, 1);
        assert_eq!(ping_check_interval(&config), Duration::from_secs(1));
    }
}
