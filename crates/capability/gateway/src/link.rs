use crate::config::GatewayConfig;
use crate::error::GatewayError;
use async_trait::async_trait;
use iot_relay::{MessagePublisher, RelayError};
use rumqttc::{AsyncClient, EventLoop, QoS};
use tracing::debug;

/// topic 订阅接口。
#[async_trait]
pub trait TopicSubscriber: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<(), GatewayError>;
}

/// 基于 rumqttc 客户端的发布/订阅链路。
#[derive(Clone)]
pub struct MqttLink {
    client: AsyncClient,
    qos: QoS,
}

impl MqttLink {
    /// 创建客户端；返回的事件循环交给 [`crate::TransportGateway::start`] 驱动。
    pub fn new(config: &GatewayConfig) -> (Self, EventLoop) {
        let (client, eventloop) =
            AsyncClient::new(config.mqtt_options(), config.client_capacity.max(1));
        (
            Self {
                client,
                qos: config.qos(),
            },
            eventloop,
        )
    }

    pub async fn disconnect(&self) -> Result<(), GatewayError> {
        self.client
            .disconnect()
            .await
            .map_err(|err| GatewayError::Disconnect(err.to_string()))
    }
}

#[async_trait]
impl MessagePublisher for MqttLink {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RelayError> {
        debug!(
            target: "iot.gateway",
            topic = %topic,
            payload_size = payload.len(),
            "mqtt_publish"
        );
        self.client
            .publish(topic, self.qos, false, payload)
            .await
            .map_err(|err| RelayError::Publish(err.to_string()))
    }
}

#[async_trait]
impl TopicSubscriber for MqttLink {
    async fn subscribe(&self, topic: &str) -> Result<(), GatewayError> {
        self.client
            .subscribe(topic, self.qos)
            .await
            .map_err(|err| GatewayError::Subscribe(err.to_string()))
    }
}
