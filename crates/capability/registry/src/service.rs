//! 设备注册表服务。

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::events::{EventNotifier, NoopNotifier, ResourceEvent};
use crate::locks::ResourceLocks;
use domain::{ActorContext, SYSTEM_ACTOR, now_epoch_ms};
use iot_access::{AccessOp, AccessTarget, Authorizer};
use iot_storage::{
    AuditLogRecord, AuditLogStore, DepartmentDirectory, ReservationStore, ResourceRecord,
    ResourceStore, ResourceUpdate, ValueSeries,
};
use iot_telemetry::{record_device_timed_out, record_resource_registered, record_resource_removed};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

const AUDIT_CATEGORY: &str = "RESOURCE";
const DEFAULT_GROUP: &str = "default";

/// 新建资源输入。
#[derive(Debug, Clone)]
pub struct NewResource {
    /// 联网设备 UUID；为空表示普通资产
    pub uuid: Option<String>,
    pub name: String,
    pub description: String,
    pub ip: Option<String>,
    pub group: String,
    pub department_token: String,
    pub max_slots: u32,
    /// 设备发送 topic 后缀（`{uuid}/{suffix}`）
    pub send_suffix: Option<String>,
    pub recv_suffix: Option<String>,
}

/// 注册结果。
#[derive(Debug, Clone)]
pub struct Registration {
    pub resource: ResourceRecord,
    /// 本次调用是否新建了资源
    pub created: bool,
}

/// 设备注册表：资源生命周期与设备状态。
#[derive(Clone)]
pub struct DeviceRegistry {
    resources: Arc<dyn ResourceStore>,
    reservations: Arc<dyn ReservationStore>,
    departments: Arc<dyn DepartmentDirectory>,
    audit_store: Arc<dyn AuditLogStore>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn EventNotifier>,
    locks: ResourceLocks,
    config: RegistryConfig,
}

impl DeviceRegistry {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        reservations: Arc<dyn ReservationStore>,
        departments: Arc<dyn DepartmentDirectory>,
        audit_store: Arc<dyn AuditLogStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            resources,
            reservations,
            departments,
            audit_store,
            authorizer,
            notifier: Arc::new(NoopNotifier),
            locks: ResourceLocks::new(),
            config: RegistryConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn EventNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config.sanitized();
        self
    }

    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        self.authorizer.clone()
    }

    /// UUID 是否已注册。
    pub async fn exists(&self, uuid: &str) -> Result<bool, RegistryError> {
        Ok(self.resources.find_by_uuid(uuid).await?.is_some())
    }

    /// 按 UUID 查找（不做授权，供设备报文处理使用）。
    pub async fn resolve_uuid(&self, uuid: &str) -> Result<Option<ResourceRecord>, RegistryError> {
        Ok(self.resources.find_by_uuid(uuid).await?)
    }

    /// 按内部 ID 加载（不做授权）。
    pub async fn load(&self, resource_id: &str) -> Result<Option<ResourceRecord>, RegistryError> {
        Ok(self.resources.find_resource(resource_id).await?)
    }

    pub async fn find_by_uuid(
        &self,
        ctx: &ActorContext,
        uuid: &str,
    ) -> Result<Option<ResourceRecord>, RegistryError> {
        let Some(resource) = self.resources.find_by_uuid(uuid).await? else {
            return Ok(None);
        };
        self.authorizer.authorize(
            ctx,
            AccessOp::Read,
            &AccessTarget::resource(&resource.department_id),
        )?;
        Ok(Some(resource))
    }

    pub async fn find_resource(
        &self,
        ctx: &ActorContext,
        resource_id: &str,
    ) -> Result<Option<ResourceRecord>, RegistryError> {
        let Some(resource) = self.resources.find_resource(resource_id).await? else {
            return Ok(None);
        };
        self.authorizer.authorize(
            ctx,
            AccessOp::Read,
            &AccessTarget::resource(&resource.department_id),
        )?;
        Ok(Some(resource))
    }

    pub async fn network_uuids(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.resources.list_network_uuids().await?)
    }

    pub async fn list_online(&self) -> Result<Vec<ResourceRecord>, RegistryError> {
        Ok(self.resources.list_online().await?)
    }

    pub async fn list_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<ResourceRecord>, RegistryError> {
        Ok(self.resources.list_by_department(department_id).await?)
    }

    pub async fn list_group(
        &self,
        department_id: &str,
        group: &str,
    ) -> Result<Vec<ResourceRecord>, RegistryError> {
        let items = self.resources.list_by_department(department_id).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.resource_group == group)
            .collect())
    }

    /// 创建资源，UUID 已存在时原样返回已有资源。
    pub async fn create(
        &self,
        ctx: &ActorContext,
        input: NewResource,
    ) -> Result<ResourceRecord, RegistryError> {
        Ok(self.register(ctx, input).await?.resource)
    }

    /// 同 [`DeviceRegistry::create`]，额外返回是否新建。
    pub async fn register(
        &self,
        ctx: &ActorContext,
        input: NewResource,
    ) -> Result<Registration, RegistryError> {
        if let Some(uuid) = input.uuid.as_deref() {
            if let Some(existing) = self.resources.find_by_uuid(uuid).await? {
                return Ok(Registration {
                    resource: existing,
                    created: false,
                });
            }
        }

        let department = self
            .departments
            .find_by_token(&input.department_token)
            .await?
            .ok_or_else(|| RegistryError::UnknownDepartment(input.department_token.clone()))?;
        self.authorizer.authorize(
            ctx,
            AccessOp::Create,
            &AccessTarget::resource(&department.department_id),
        )?;
        if input.max_slots < 1 {
            return Err(RegistryError::InvalidSlots);
        }
        let group = if input.group.trim().is_empty() {
            DEFAULT_GROUP.to_string()
        } else {
            input.group.clone()
        };

        let _guard = self
            .locks
            .acquire(&format!("group:{}/{}", department.department_id, group))
            .await;
        if let Some(uuid) = input.uuid.as_deref() {
            if let Some(existing) = self.resources.find_by_uuid(uuid).await? {
                return Ok(Registration {
                    resource: existing,
                    created: false,
                });
            }
        }
        if self
            .resources
            .find_by_group_and_name(&department.department_id, &group, &input.name)
            .await?
            .is_some()
        {
            return Err(RegistryError::DuplicateName {
                group,
                name: input.name,
            });
        }

        let now = now_epoch_ms();
        let topic = |suffix: Option<&str>| match (input.uuid.as_deref(), suffix) {
            (Some(uuid), Some(suffix)) if !suffix.is_empty() => {
                Some(format!("{}/{}", uuid, suffix.trim_start_matches('/')))
            }
            _ => None,
        };
        let record = ResourceRecord {
            resource_id: uuid::Uuid::new_v4().to_string(),
            uuid: input.uuid.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            ip: input.ip.clone(),
            max_slots: input.max_slots,
            online: false,
            last_ping_ms: now,
            send_topic: topic(input.send_suffix.as_deref()),
            receive_topic: topic(input.recv_suffix.as_deref()),
            data_received: Vec::new(),
            data_to_send: Vec::new(),
            values: BTreeMap::new(),
            commands: BTreeSet::new(),
            latitude: None,
            longitude: None,
            department_id: department.department_id.clone(),
            resource_group: group,
            created_at_ms: now,
        };
        let resource = self.resources.create_resource(record).await?;
        record_resource_registered();
        info!(
            target: "iot.registry",
            resource_id = %resource.resource_id,
            uuid = ?resource.uuid,
            department_id = %resource.department_id,
            group = %resource.resource_group,
            name = %resource.name,
            max_slots = resource.max_slots,
            actor = %ctx.user_id,
            "resource_created"
        );
        self.audit(&ctx.user_id, "CREATE", &resource.resource_id, Some(resource.name.clone()))
            .await;
        Ok(Registration {
            resource,
            created: true,
        })
    }

    /// 置为在线或离线；上线时同时刷新心跳时间。
    pub async fn set_online(
        &self,
        resource_id: &str,
        online: bool,
    ) -> Result<ResourceRecord, RegistryError> {
        let _guard = self.locks.acquire(resource_id).await;
        let current = self.require(resource_id).await?;
        if current.online == online && !online {
            return Ok(current);
        }
        let update = ResourceUpdate {
            online: Some(online),
            last_ping_ms: online.then(now_epoch_ms),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        if current.online != online {
            info!(
                target: "iot.registry",
                resource_id = %resource_id,
                online = online,
                "resource_online_changed"
            );
            self.raise(
                resource_id,
                "online",
                Some(current.online.to_string()),
                Some(online.to_string()),
            );
        }
        Ok(updated)
    }

    pub async fn set_offline(&self, resource_id: &str) -> Result<ResourceRecord, RegistryError> {
        self.set_online(resource_id, false).await
    }

    /// 刷新心跳时间。
    pub async fn record_ping(&self, resource_id: &str) -> Result<ResourceRecord, RegistryError> {
        let _guard = self.locks.acquire(resource_id).await;
        let update = ResourceUpdate {
            last_ping_ms: Some(now_epoch_ms()),
            ..Default::default()
        };
        self.update(resource_id, update).await
    }

    /// 追加数值样本（时间戳取当前时间），并将设备置为在线。
    pub async fn set_value(
        &self,
        resource_id: &str,
        name: &str,
        value: &str,
    ) -> Result<ResourceRecord, RegistryError> {
        self.set_value_at(resource_id, name, value, now_epoch_ms())
            .await
    }

    pub async fn set_value_at(
        &self,
        resource_id: &str,
        name: &str,
        value: &str,
        ts_ms: i64,
    ) -> Result<ResourceRecord, RegistryError> {
        let _guard = self.locks.acquire(resource_id).await;
        let current = self.require(resource_id).await?;
        let mut values = current.values.clone();
        if !values.contains_key(name) && values.len() >= self.config.max_value_series {
            warn!(
                target: "iot.registry",
                resource_id = %resource_id,
                name = %name,
                max_value_series = self.config.max_value_series,
                "value_series_limit_reached"
            );
            return Ok(current);
        }
        let old_value = values
            .get(name)
            .and_then(|series| series.last())
            .map(|sample| sample.value.clone());
        values
            .entry(name.to_string())
            .or_insert_with(ValueSeries::new)
            .push(ts_ms, value, self.config.max_value_bytes);

        let update = ResourceUpdate {
            values: Some(values),
            online: Some(true),
            last_ping_ms: Some(now_epoch_ms()),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        self.raise(resource_id, name, old_value, Some(value.to_string()));
        if !current.online {
            info!(
                target: "iot.registry",
                resource_id = %resource_id,
                online = true,
                "resource_online_changed"
            );
            self.raise(
                resource_id,
                "online",
                Some(false.to_string()),
                Some(true.to_string()),
            );
        }
        Ok(updated)
    }

    /// 删除命名数值及其历史。
    pub async fn clear_value(
        &self,
        resource_id: &str,
        name: &str,
    ) -> Result<ResourceRecord, RegistryError> {
        let _guard = self.locks.acquire(resource_id).await;
        let current = self.require(resource_id).await?;
        let mut values = current.values.clone();
        let Some(removed) = values.remove(name) else {
            return Ok(current);
        };
        let update = ResourceUpdate {
            values: Some(values),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        self.raise(
            resource_id,
            name,
            removed.last().map(|sample| sample.value.clone()),
            None,
        );
        Ok(updated)
    }

    /// 命名数值的最新值。
    pub async fn last_value(
        &self,
        resource_id: &str,
        name: &str,
    ) -> Result<Option<String>, RegistryError> {
        let current = self.require(resource_id).await?;
        Ok(current
            .values
            .get(name)
            .and_then(|series| series.last())
            .map(|sample| sample.value.clone()))
    }

    /// 替换设备支持的命令集合。
    pub async fn set_commands(
        &self,
        resource_id: &str,
        commands: BTreeSet<String>,
    ) -> Result<ResourceRecord, RegistryError> {
        let current = self.require(resource_id).await?;
        let old = join_commands(&current.commands);
        let new = join_commands(&commands);
        let update = ResourceUpdate {
            commands: Some(commands),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        self.raise(resource_id, "commands", Some(old), Some(new));
        Ok(updated)
    }

    pub async fn set_coordinates(
        &self,
        resource_id: &str,
        latitude: &str,
        longitude: &str,
    ) -> Result<ResourceRecord, RegistryError> {
        let current = self.require(resource_id).await?;
        let update = ResourceUpdate {
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        self.raise(
            resource_id,
            "latitude",
            current.latitude,
            Some(latitude.to_string()),
        );
        self.raise(
            resource_id,
            "longitude",
            current.longitude,
            Some(longitude.to_string()),
        );
        Ok(updated)
    }

    /// 保存设备上报的原始数据。
    pub async fn write_data_received(
        &self,
        resource_id: &str,
        data: Vec<u8>,
    ) -> Result<ResourceRecord, RegistryError> {
        let size = data.len();
        let update = ResourceUpdate {
            data_received: Some(data),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        self.raise(resource_id, "dataReceived", None, Some(size.to_string()));
        Ok(updated)
    }

    /// 保存最近一次下发给设备的原始数据。
    pub async fn record_data_to_send(
        &self,
        resource_id: &str,
        data: Vec<u8>,
    ) -> Result<ResourceRecord, RegistryError> {
        let size = data.len();
        let update = ResourceUpdate {
            data_to_send: Some(data),
            ..Default::default()
        };
        let updated = self.update(resource_id, update).await?;
        self.raise(resource_id, "dataToSend", None, Some(size.to_string()));
        Ok(updated)
    }

    /// 部门内除请求方以外的联网设备。
    ///
    /// 未提供令牌时使用请求方自身所在的部门。
    pub async fn department_siblings(
        &self,
        requester_uuid: &str,
        department_token: Option<&str>,
    ) -> Result<Vec<ResourceRecord>, RegistryError> {
        let department_id = match department_token {
            Some(token) => {
                self.departments
                    .find_by_token(token)
                    .await?
                    .ok_or_else(|| RegistryError::UnknownDepartment(token.to_string()))?
                    .department_id
            }
            None => match self.resources.find_by_uuid(requester_uuid).await? {
                Some(requester) => requester.department_id,
                None => return Ok(Vec::new()),
            },
        };
        let items = self.resources.list_by_department(&department_id).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.is_network() && item.uuid.as_deref() != Some(requester_uuid))
            .collect())
    }

    /// 删除资源，级联删除其预约和数值历史。
    pub async fn delete(&self, ctx: &ActorContext, resource_id: &str) -> Result<(), RegistryError> {
        let guard = self.locks.acquire(resource_id).await;
        let current = self.require(resource_id).await?;
        self.authorizer.authorize(
            ctx,
            AccessOp::Delete,
            &AccessTarget::resource(&current.department_id),
        )?;
        let reservations = self.reservations.delete_for_resource(resource_id).await?;
        self.resources.delete_resource(resource_id).await?;
        drop(guard);
        self.locks.remove(resource_id);
        record_resource_removed();
        info!(
            target: "iot.registry",
            resource_id = %resource_id,
            uuid = ?current.uuid,
            reservations_removed = reservations,
            actor = %ctx.user_id,
            "resource_deleted"
        );
        self.audit(&ctx.user_id, "DELETE", resource_id, Some(current.name.clone()))
            .await;
        self.raise(resource_id, "deleted", Some(false.to_string()), Some(true.to_string()));
        Ok(())
    }

    /// 将心跳超时的在线设备置为离线，返回处理数量。
    pub async fn expire_stale_pings(&self, now_ms: i64) -> Result<usize, RegistryError> {
        let timeout = self.config.ping_timeout_ms as i64;
        let online = self.resources.list_online().await?;
        let mut expired = 0;
        for resource in online {
            if now_ms - resource.last_ping_ms <= timeout {
                continue;
            }
            match self.expire_if_stale(&resource.resource_id, now_ms).await {
                Ok(true) => expired += 1,
                Ok(false) | Err(RegistryError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(expired)
    }

    /// 在资源锁内重新读取心跳时间，仍超时才置为离线。
    pub async fn expire_if_stale(&self, resource_id: &str, now_ms: i64) -> Result<bool, RegistryError> {
        let _guard = self.locks.acquire(resource_id).await;
        let current = self.require(resource_id).await?;
        if !current.online || now_ms - current.last_ping_ms <= self.config.ping_timeout_ms as i64 {
            return Ok(false);
        }
        let update = ResourceUpdate {
            online: Some(false),
            ..Default::default()
        };
        self.update(resource_id, update).await?;
        record_device_timed_out();
        info!(
            target: "iot.registry",
            resource_id = %resource_id,
            uuid = ?current.uuid,
            last_ping_ms = current.last_ping_ms,
            "device_ping_timed_out"
        );
        self.raise(
            resource_id,
            "online",
            Some(true.to_string()),
            Some(false.to_string()),
        );
        Ok(true)
    }

    async fn require(&self, resource_id: &str) -> Result<ResourceRecord, RegistryError> {
        self.resources
            .find_resource(resource_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(resource_id.to_string()))
    }

    async fn update(
        &self,
        resource_id: &str,
        update: ResourceUpdate,
    ) -> Result<ResourceRecord, RegistryError> {
        self.resources
            .update_resource(resource_id, update)
            .await?
            .ok_or_else(|| RegistryError::NotFound(resource_id.to_string()))
    }

    fn raise(
        &self,
        resource_id: &str,
        property: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        if !self.config.fire_events {
            return;
        }
        self.notifier.raise_event(ResourceEvent {
            resource_id: resource_id.to_string(),
            property: property.to_string(),
            old_value,
            new_value,
            ttl_ms: self.config.event_ttl_ms,
            ts_ms: now_epoch_ms(),
        });
    }

    async fn audit(&self, actor: &str, action: &str, object_id: &str, message: Option<String>) {
        let actor = if actor.is_empty() { SYSTEM_ACTOR } else { actor };
        let record = AuditLogRecord {
            audit_id: uuid::Uuid::new_v4().to_string(),
            actor: actor.to_string(),
            category: AUDIT_CATEGORY.to_string(),
            action: action.to_string(),
            object_id: object_id.to_string(),
            message,
            ts_ms: now_epoch_ms(),
        };
        let _ = self.audit_store.create_audit_log(record).await;
    }
}

fn join_commands(commands: &BTreeSet<String>) -> String {
    commands.iter().cloned().collect::<Vec<_>>().join(":")
}
