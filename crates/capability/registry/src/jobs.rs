use crate::service::DeviceRegistry;
use domain::now_epoch_ms;
use std::time::Duration;
use tracing::{info, warn};

/// 周期性检查心跳超时的设备。
pub fn spawn_ping_timeout_job(
    registry: DeviceRegistry,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match registry.expire_stale_pings(now_epoch_ms()).await {
                Ok(0) => {}
                Ok(expired) => {
                    info!(target: "iot.registry", expired = expired, "ping_timeout_sweep");
                }
                Err(err) => {
                    warn!(target: "iot.registry", error = %err, "ping_timeout_sweep_failed");
                }
            }
        }
    })
}
