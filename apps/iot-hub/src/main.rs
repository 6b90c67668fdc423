//! 设备接入服务：装配注册表、预约引擎、命令中继与 MQTT 网关，并提供运维 HTTP 接口。

mod handlers;
mod middleware;
mod routes;
mod wiring;

use iot_access::PermissionAuthorizer;
use iot_config::AppConfig;
use iot_gateway::{ConnectionTracker, MessageRouter, MqttLink, TransportGateway};
use iot_registry::{DeviceRegistry, TracingNotifier, spawn_ping_timeout_job};
use iot_relay::CommandRelay;
use iot_reservation::{ReservationEngine, spawn_cleanup_job};
use iot_telemetry::init_tracing;
use std::sync::Arc;
use tracing::info;
use wiring::Stores;

/// HTTP 处理器共享的状态。
#[derive(Clone)]
pub struct AppState {
    /// `memory` 或 `postgres`
    pub storage_backend: &'static str,
    /// 未启用 MQTT 时为 `None`
    pub mqtt: Option<ConnectionTracker>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let stores = Stores::from_config(&config).await?;
    let authorizer = Arc::new(PermissionAuthorizer::new());
    let registry = DeviceRegistry::new(
        stores.resources.clone(),
        stores.reservations.clone(),
        stores.departments.clone(),
        stores.audit.clone(),
        authorizer.clone(),
    )
    .with_config(wiring::registry_config(&config))
    .with_notifier(Arc::new(TracingNotifier));
    let engine = ReservationEngine::new_with_config(
        registry.clone(),
        stores.reservations.clone(),
        stores.audit.clone(),
        authorizer,
        wiring::reservation_config(&config),
    );

    let mut gateway = None;
    let mut tracker = None;
    if config.mqtt_enabled {
        let gateway_config = wiring::gateway_config(&config);
        let (link, eventloop) = MqttLink::new(&gateway_config);
        let link = Arc::new(link);
        let relay = CommandRelay::new_with_config(
            engine.clone(),
            link.clone(),
            wiring::relay_config(&config),
        );
        let router = MessageRouter::new(
            registry.clone(),
            relay,
            link.clone(),
            link.clone(),
            wiring::router_options(&config),
        );
        let transport = TransportGateway::new(gateway_config, router, link);
        tracker = Some(transport.tracker().clone());
        gateway = Some(transport.start(eventloop));
    } else {
        info!(target: "iot.hub", "mqtt_disabled");
    }

    let ping_job = spawn_ping_timeout_job(registry, wiring::ping_check_interval(&config));
    let cleanup_job = spawn_cleanup_job(engine, wiring::cleanup_interval(&config));

    let state = AppState {
        storage_backend: stores.backend,
        mqtt: tracker,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(
        target: "iot.hub",
        http_addr = %config.http_addr,
        storage = stores.backend,
        "iot_hub_started"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(gateway) = gateway {
        gateway.stop().await;
    }
    ping_job.abort();
    cleanup_job.abort();
    info!(target: "iot.hub", "iot_hub_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "iot.hub", error = %err, "ctrl_c_listen_failed");
    }
}
