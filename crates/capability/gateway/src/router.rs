//! 入站消息分发：按 topic 形态交给发现、状态、数据处理。
//!
//! 处理失败只记录日志和计数，不向传输层抛出。

use crate::error::GatewayError;
use crate::link::TopicSubscriber;
use domain::{ActorContext, InboundMessage};
use iot_codec::{
    DISCOVERY_TOPIC, DataChannel, DeviceAck, DiscoveryMessage, ScanEntry, StatusCommand,
    TopicKind, classify_topic, encode_scan_result, parse_discovery, parse_status,
    scan_reply_topic,
};
use iot_registry::{DeviceRegistry, NewResource, RegistryError};
use iot_relay::{CommandRelay, MessagePublisher};
use iot_storage::ResourceRecord;
use iot_telemetry::{
    record_data_message, record_discovery_message, record_dropped_malformed,
    record_dropped_unknown_device, record_message_received, record_status_message,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 分发选项。
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// 发现报文缺少部门令牌时使用的令牌；为空表示不回退
    pub default_department_token: Option<String>,
}

/// 入站消息分发器。
#[derive(Clone)]
pub struct MessageRouter {
    registry: DeviceRegistry,
    relay: CommandRelay,
    publisher: Arc<dyn MessagePublisher>,
    subscriber: Arc<dyn TopicSubscriber>,
    options: RouterOptions,
}

impl MessageRouter {
    pub fn new(
        registry: DeviceRegistry,
        relay: CommandRelay,
        publisher: Arc<dyn MessagePublisher>,
        subscriber: Arc<dyn TopicSubscriber>,
        options: RouterOptions,
    ) -> Self {
        Self {
            registry,
            relay,
            publisher,
            subscriber,
            options,
        }
    }

    /// 订阅发现 topic 及所有已注册设备的 topic，返回订阅数量。
    pub async fn subscribe_all(&self) -> Result<usize, GatewayError> {
        self.subscriber.subscribe(DISCOVERY_TOPIC).await?;
        let mut count = 1;
        for uuid in self.registry.network_uuids().await? {
            let Some(resource) = self.registry.resolve_uuid(&uuid).await? else {
                continue;
            };
            count += self.subscribe_device(&resource).await?;
        }
        info!(target: "iot.gateway", topics = count, "mqtt_subscribed");
        Ok(count)
    }

    /// 订阅设备的状态、发送、接收 topic。
    pub async fn subscribe_device(&self, resource: &ResourceRecord) -> Result<usize, GatewayError> {
        let topics = [
            resource.uuid.as_deref(),
            resource.send_topic.as_deref(),
            resource.receive_topic.as_deref(),
        ];
        let mut count = 0;
        for topic in topics.into_iter().flatten() {
            self.subscriber.subscribe(topic).await?;
            count += 1;
        }
        Ok(count)
    }

    /// 处理一条入站消息。
    pub async fn route(&self, message: InboundMessage) {
        record_message_received();
        match classify_topic(&message.topic) {
            TopicKind::Discovery => {
                record_discovery_message();
                self.handle_discovery(&message).await;
            }
            TopicKind::Status { uuid } => {
                record_status_message();
                self.handle_status(&uuid, &message).await;
            }
            TopicKind::Data { uuid, channel } => {
                record_data_message();
                self.handle_data(&uuid, channel, message).await;
            }
            TopicKind::Other => {
                debug!(target: "iot.gateway", topic = %message.topic, "topic_ignored");
            }
        }
    }

    async fn handle_discovery(&self, message: &InboundMessage) {
        let payload = message.payload_text();
        let discovery = match parse_discovery(&payload) {
            Ok(discovery) => discovery,
            Err(err) => {
                record_dropped_malformed();
                warn!(target: "iot.gateway", error = %err, payload = %payload, "discovery_malformed");
                return;
            }
        };
        // 已注册设备的重复发现报文不做任何处理
        match self.registry.exists(&discovery.uuid).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => {
                warn!(target: "iot.gateway", uuid = %discovery.uuid, error = %err, "device_lookup_failed");
                return;
            }
        }
        let Some(token) = discovery
            .department_token
            .clone()
            .or_else(|| self.options.default_department_token.clone())
        else {
            warn!(target: "iot.gateway", uuid = %discovery.uuid, "discovery_missing_department");
            return;
        };
        let uuid = discovery.uuid.clone();
        let input = new_resource(discovery, token);
        match self.registry.register(&ActorContext::system(), input).await {
            Ok(registration) if registration.created => {
                info!(
                    target: "iot.gateway",
                    uuid = %uuid,
                    resource_id = %registration.resource.resource_id,
                    "device_registered"
                );
                self.ack(&registration.resource, DeviceAck::Registered).await;
                if let Err(err) = self.subscribe_device(&registration.resource).await {
                    warn!(target: "iot.gateway", uuid = %uuid, error = %err, "device_subscribe_failed");
                }
            }
            Ok(_) => {
                debug!(target: "iot.gateway", uuid = %uuid, "discovery_known_device");
            }
            Err(RegistryError::UnknownDepartment(token)) => {
                warn!(target: "iot.gateway", uuid = %uuid, token = %token, "discovery_unknown_department");
            }
            Err(err) => {
                warn!(target: "iot.gateway", uuid = %uuid, error = %err, "discovery_failed");
            }
        }
    }

    async fn handle_status(&self, uuid: &str, message: &InboundMessage) {
        let Some(resource) = self.resolve(uuid).await else {
            return;
        };
        let payload = message.payload_text();
        let command = match parse_status(&payload) {
            Ok(command) => command,
            Err(err) => {
                record_dropped_malformed();
                warn!(target: "iot.gateway", uuid = %uuid, error = %err, "status_malformed");
                return;
            }
        };
        let keyword = command.keyword().to_string();
        let resource_id = resource.resource_id.as_str();
        let result = match command {
            StatusCommand::Remove => {
                match self.registry.delete(&ActorContext::system(), resource_id).await {
                    Ok(()) => {
                        self.ack(&resource, DeviceAck::Unregistered).await;
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            StatusCommand::Startup => match self.registry.set_online(resource_id, true).await {
                Ok(_) => {
                    self.ack(&resource, DeviceAck::Online).await;
                    Ok(())
                }
                Err(err) => Err(err),
            },
            StatusCommand::Shutdown => match self.registry.set_online(resource_id, false).await {
                Ok(_) => {
                    self.ack(&resource, DeviceAck::Offline).await;
                    Ok(())
                }
                Err(err) => Err(err),
            },
            StatusCommand::Set { name, value } => self
                .registry
                .set_value(resource_id, &name, &value)
                .await
                .map(|_| ()),
            StatusCommand::Clear { name } => self
                .registry
                .clear_value(resource_id, &name)
                .await
                .map(|_| ()),
            StatusCommand::Geo {
                latitude,
                longitude,
            } => self
                .registry
                .set_coordinates(resource_id, &latitude, &longitude)
                .await
                .map(|_| ()),
            StatusCommand::Ping => self.registry.record_ping(resource_id).await.map(|_| ()),
            StatusCommand::Commands(commands) => self
                .registry
                .set_commands(resource_id, commands)
                .await
                .map(|_| ()),
            StatusCommand::SendCommand {
                target_uuid,
                command,
                param,
            } => {
                self.forward_command(uuid, &target_uuid, &command, param.as_deref())
                    .await;
                Ok(())
            }
            StatusCommand::ScanDevices {
                device_uuid,
                department_token,
            } => {
                self.scan_devices(&device_uuid, department_token.as_deref())
                    .await;
                Ok(())
            }
            StatusCommand::GetCommands { target_uuid } => {
                debug!(target: "iot.gateway", uuid = %uuid, target_uuid = %target_uuid, "getcommands_ignored");
                Ok(())
            }
            StatusCommand::Slots => {
                debug!(target: "iot.gateway", uuid = %uuid, "slots_ignored");
                Ok(())
            }
            StatusCommand::Unknown(keyword) => {
                debug!(target: "iot.gateway", uuid = %uuid, keyword = %keyword, "status_unknown_keyword");
                Ok(())
            }
        };
        match result {
            Ok(()) => {
                debug!(target: "iot.gateway", uuid = %uuid, keyword = %keyword, "status_handled");
            }
            Err(err) => {
                warn!(target: "iot.gateway", uuid = %uuid, keyword = %keyword, error = %err, "status_failed");
            }
        }
    }

    async fn handle_data(&self, uuid: &str, channel: DataChannel, message: InboundMessage) {
        if channel != DataChannel::Write {
            debug!(target: "iot.gateway", topic = %message.topic, "data_channel_ignored");
            return;
        }
        let Some(resource) = self.resolve(uuid).await else {
            return;
        };
        if let Err(err) = self
            .registry
            .write_data_received(&resource.resource_id, message.payload)
            .await
        {
            warn!(target: "iot.gateway", uuid = %uuid, error = %err, "data_write_failed");
        }
    }

    async fn forward_command(
        &self,
        source_uuid: &str,
        target_uuid: &str,
        command: &str,
        param: Option<&str>,
    ) {
        let Some(target) = self.resolve(target_uuid).await else {
            return;
        };
        match self
            .relay
            .send_command_to_resource(&target.resource_id, command, param)
            .await
        {
            Ok(()) => {
                info!(
                    target: "iot.gateway",
                    source_uuid = %source_uuid,
                    target_uuid = %target_uuid,
                    command = %command,
                    "device_command_forwarded"
                );
            }
            Err(err) => {
                warn!(
                    target: "iot.gateway",
                    source_uuid = %source_uuid,
                    target_uuid = %target_uuid,
                    error = %err,
                    "device_command_forward_failed"
                );
            }
        }
    }

    async fn scan_devices(&self, device_uuid: &str, department_token: Option<&str>) {
        // 回复地址必须是已注册设备
        if self.resolve(device_uuid).await.is_none() {
            return;
        }
        let siblings = match self
            .registry
            .department_siblings(device_uuid, department_token)
            .await
        {
            Ok(siblings) => siblings,
            Err(err) => {
                warn!(target: "iot.gateway", uuid = %device_uuid, error = %err, "scan_failed");
                return;
            }
        };
        if siblings.is_empty() {
            return;
        }
        let entries: Vec<ScanEntry> = siblings
            .into_iter()
            .filter_map(|item| {
                Some(ScanEntry {
                    uuid: item.uuid?,
                    name: item.name,
                    description: item.description,
                    max_slots: item.max_slots,
                })
            })
            .collect();
        let topic = scan_reply_topic(device_uuid);
        let payload = encode_scan_result(&entries);
        if let Err(err) = self.publisher.publish(&topic, payload.into_bytes()).await {
            warn!(target: "iot.gateway", topic = %topic, error = %err, "scan_reply_failed");
        }
    }

    async fn resolve(&self, uuid: &str) -> Option<ResourceRecord> {
        match self.registry.resolve_uuid(uuid).await {
            Ok(Some(resource)) => Some(resource),
            Ok(None) => {
                record_dropped_unknown_device();
                info!(target: "iot.gateway", uuid = %uuid, "unknown_device");
                None
            }
            Err(err) => {
                warn!(target: "iot.gateway", uuid = %uuid, error = %err, "device_lookup_failed");
                None
            }
        }
    }

    async fn ack(&self, resource: &ResourceRecord, ack: DeviceAck) {
        let Some(topic) = resource.receive_topic.as_deref() else {
            return;
        };
        if let Err(err) = self
            .publisher
            .publish(topic, ack.as_str().as_bytes().to_vec())
            .await
        {
            warn!(target: "iot.gateway", topic = %topic, ack = ack.as_str(), error = %err, "ack_failed");
        }
    }
}

fn topic_suffix(uuid: &str, topic: &str) -> Option<String> {
    topic
        .strip_prefix(uuid)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|suffix| !suffix.is_empty())
        .map(|suffix| suffix.to_string())
}

fn new_resource(discovery: DiscoveryMessage, department_token: String) -> NewResource {
    NewResource {
        send_suffix: topic_suffix(&discovery.uuid, &discovery.send_topic),
        recv_suffix: topic_suffix(&discovery.uuid, &discovery.receive_topic),
        uuid: Some(discovery.uuid),
        name: discovery.name,
        description: discovery.description,
        ip: None,
        group: discovery.group,
        department_token,
        max_slots: discovery.max_slots,
    }
}
