use crate::engine::ReservationEngine;
use std::time::Duration;
use tracing::{info, warn};

/// 周期性清理已结束的预约。
pub fn spawn_cleanup_job(
    engine: ReservationEngine,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match engine.cleanup_reservations().await {
                Ok(0) => {}
                Ok(removed) => {
                    info!(target: "iot.reservation", removed = removed, "reservation_sweep");
                }
                Err(err) => {
                    warn!(target: "iot.reservation", error = %err, "reservation_sweep_failed");
                }
            }
        }
    })
}
