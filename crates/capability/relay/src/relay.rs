use crate::error::RelayError;
use crate::publisher::{MessagePublisher, publish_with_retry};
use domain::ActorContext;
use iot_access::{AccessOp, AccessTarget};
use iot_codec::encode_command;
use iot_reservation::ReservationEngine;
use iot_storage::ResourceRecord;
use iot_telemetry::{record_command_publish_failure, record_command_relayed};
use std::sync::Arc;
use tracing::{info, warn};

/// 中继参数。
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub publish_max_retries: u64,
    pub publish_backoff_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            publish_max_retries: 2,
            publish_backoff_ms: 200,
        }
    }
}

/// 命令中继：校验预约后向设备下发命令。
#[derive(Clone)]
pub struct CommandRelay {
    engine: ReservationEngine,
    publisher: Arc<dyn MessagePublisher>,
    config: RelayConfig,
}

impl CommandRelay {
    pub fn new(engine: ReservationEngine, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self::new_with_config(engine, publisher, RelayConfig::default())
    }

    pub fn new_with_config(
        engine: ReservationEngine,
        publisher: Arc<dyn MessagePublisher>,
        config: RelayConfig,
    ) -> Self {
        Self {
            engine,
            publisher,
            config,
        }
    }

    /// 以调用方当前生效的预约槽位下发命令，返回使用的槽位号。
    pub async fn send_command(
        &self,
        ctx: &ActorContext,
        resource_id: &str,
        command: &str,
        param: Option<&str>,
    ) -> Result<u32, RelayError> {
        let resource = self.require_resource(resource_id).await?;
        self.engine.registry().authorizer().authorize(
            ctx,
            AccessOp::Read,
            &AccessTarget::resource(&resource.department_id),
        )?;
        let topic = receive_topic(&resource)?;
        let Some(slot) = self.engine.active_slot(resource_id, &ctx.user_id).await? else {
            info!(
                target: "iot.relay",
                resource_id = %resource_id,
                user_id = %ctx.user_id,
                command = %command,
                "command_rejected_no_reservation"
            );
            return Err(RelayError::NoActiveReservation {
                user_id: ctx.user_id.clone(),
                resource_id: resource_id.to_string(),
            });
        };
        self.publish(&topic, encode_command(command, param, slot))
            .await?;
        info!(
            target: "iot.relay",
            resource_id = %resource_id,
            user_id = %ctx.user_id,
            command = %command,
            slot = slot,
            "command_relayed"
        );
        Ok(slot)
    }

    /// 特权路径：不校验预约，固定使用槽位 0。
    pub async fn send_command_to_resource(
        &self,
        resource_id: &str,
        command: &str,
        param: Option<&str>,
    ) -> Result<(), RelayError> {
        let resource = self.require_resource(resource_id).await?;
        let topic = receive_topic(&resource)?;
        self.publish(&topic, encode_command(command, param, 0))
            .await?;
        info!(
            target: "iot.relay",
            resource_id = %resource_id,
            command = %command,
            slot = 0,
            "command_relayed"
        );
        Ok(())
    }

    /// 保存待发数据并原样发布到设备接收 topic。
    pub async fn write_data_to_send(
        &self,
        resource_id: &str,
        data: Vec<u8>,
    ) -> Result<(), RelayError> {
        let resource = self.require_resource(resource_id).await?;
        let topic = receive_topic(&resource)?;
        self.engine
            .registry()
            .record_data_to_send(resource_id, data.clone())
            .await?;
        self.publish(&topic, data).await
    }

    async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> Result<(), RelayError> {
        let payload = payload.into();
        match publish_with_retry(
            self.publisher.clone(),
            topic,
            &payload,
            self.config.publish_max_retries,
            self.config.publish_backoff_ms,
        )
        .await
        {
            Ok(()) => {
                record_command_relayed();
                Ok(())
            }
            Err(err) => {
                record_command_publish_failure();
                warn!(target: "iot.relay", topic = %topic, error = %err, "command_publish_failed");
                Err(match err {
                    RelayError::Publish(message) => RelayError::Publish(message),
                    other => RelayError::Publish(other.to_string()),
                })
            }
        }
    }

    async fn require_resource(&self, resource_id: &str) -> Result<ResourceRecord, RelayError> {
        self.engine
            .registry()
            .load(resource_id)
            .await?
            .ok_or_else(|| RelayError::UnknownResource(resource_id.to_string()))
    }
}

fn receive_topic(resource: &ResourceRecord) -> Result<String, RelayError> {
    match (resource.is_network(), resource.receive_topic.as_deref()) {
        (true, Some(topic)) if !topic.is_empty() => Ok(topic.to_string()),
        _ => Err(RelayError::NotNetworkResource(
            resource.resource_id.clone(),
        )),
    }
}
