use crate::error::ReservationError;
use crate::slots::{active_slot_for_user, allocate_slot, slots_at};
use domain::{ActorContext, SYSTEM_ACTOR, TimeWindow, now_epoch_ms};
use iot_access::{AccessOp, AccessTarget, Authorizer};
use iot_registry::DeviceRegistry;
use iot_storage::{
    AuditLogRecord, AuditLogStore, ReservationRecord, ReservationStore, ResourceRecord,
};
use iot_telemetry::{
    record_reservation_created, record_reservation_rejected, record_reservations_expired,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const AUDIT_CATEGORY: &str = "RESERVATION";

/// 预约引擎参数。
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// 判断预约是否生效时向后看的宽限时长
    pub active_grace_ms: i64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            active_grace_ms: 10_000,
        }
    }
}

/// 预约引擎：按资源串行分配槽位。
#[derive(Clone)]
pub struct ReservationEngine {
    registry: DeviceRegistry,
    reservations: Arc<dyn ReservationStore>,
    audit_store: Arc<dyn AuditLogStore>,
    authorizer: Arc<dyn Authorizer>,
    config: ReservationConfig,
}

impl ReservationEngine {
    pub fn new(
        registry: DeviceRegistry,
        reservations: Arc<dyn ReservationStore>,
        audit_store: Arc<dyn AuditLogStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self::new_with_config(
            registry,
            reservations,
            audit_store,
            authorizer,
            ReservationConfig::default(),
        )
    }

    pub fn new_with_config(
        registry: DeviceRegistry,
        reservations: Arc<dyn ReservationStore>,
        audit_store: Arc<dyn AuditLogStore>,
        authorizer: Arc<dyn Authorizer>,
        config: ReservationConfig,
    ) -> Self {
        Self {
            registry,
            reservations,
            audit_store,
            authorizer,
            config,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    /// 为用户在资源上预约一个槽位。
    ///
    /// 槽位计算与写入在同一次资源锁内完成。
    pub async fn create_reservation(
        &self,
        ctx: &ActorContext,
        resource_id: &str,
        window: TimeWindow,
        user_id: &str,
    ) -> Result<ReservationRecord, ReservationError> {
        if !window.is_valid() {
            return Err(ReservationError::InvalidWindow {
                from_ms: window.from_ms,
                until_ms: window.until_ms,
            });
        }
        let _guard = self.registry.locks().acquire(resource_id).await;
        let resource = self.require_resource(resource_id).await?;
        self.authorizer.authorize(
            ctx,
            AccessOp::Create,
            &AccessTarget::reservation(&resource.department_id, user_id),
        )?;

        let existing = self.reservations.list_for_resource(resource_id).await?;
        let Some(slot_number) = allocate_slot(resource.max_slots, &existing, &window) else {
            record_reservation_rejected();
            info!(
                target: "iot.reservation",
                resource_id = %resource_id,
                user_id = %user_id,
                from_ms = window.from_ms,
                until_ms = window.until_ms,
                max_slots = resource.max_slots,
                "reservation_no_free_slot"
            );
            return Err(ReservationError::NoFreeSlot {
                resource_id: resource_id.to_string(),
            });
        };

        let record = ReservationRecord {
            reservation_id: uuid::Uuid::new_v4().to_string(),
            resource_id: resource_id.to_string(),
            user_id: user_id.to_string(),
            from_ms: window.from_ms,
            until_ms: window.until_ms,
            slot_number,
            created_at_ms: now_epoch_ms(),
        };
        let record = self.reservations.create_reservation(record).await?;
        record_reservation_created();
        info!(
            target: "iot.reservation",
            reservation_id = %record.reservation_id,
            resource_id = %record.resource_id,
            user_id = %record.user_id,
            slot_number = record.slot_number,
            from_ms = record.from_ms,
            until_ms = record.until_ms,
            actor = %ctx.user_id,
            "reservation_created"
        );
        self.audit(
            uuid::Uuid::new_v4().to_string(),
            &ctx.user_id,
            "CREATE",
            &record.reservation_id,
            Some(format!("{}:{}", record.resource_id, record.slot_number)),
        )
        .await;
        Ok(record)
    }

    /// 删除预约（所有者或具备删除权限的调用方）。
    pub async fn remove_reservation(
        &self,
        ctx: &ActorContext,
        reservation_id: &str,
    ) -> Result<(), ReservationError> {
        let reservation = self
            .reservations
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| ReservationError::NotFound(reservation_id.to_string()))?;
        let resource = self.require_resource(&reservation.resource_id).await?;
        self.authorizer.authorize(
            ctx,
            AccessOp::Delete,
            &AccessTarget::reservation(&resource.department_id, &reservation.user_id),
        )?;

        let _guard = self
            .registry
            .locks()
            .acquire(&reservation.resource_id)
            .await;
        if !self.reservations.delete_reservation(reservation_id).await? {
            return Err(ReservationError::NotFound(reservation_id.to_string()));
        }
        info!(
            target: "iot.reservation",
            reservation_id = %reservation_id,
            resource_id = %reservation.resource_id,
            actor = %ctx.user_id,
            "reservation_removed"
        );
        self.audit(
            uuid::Uuid::new_v4().to_string(),
            &ctx.user_id,
            "DELETE",
            reservation_id,
            None,
        )
        .await;
        Ok(())
    }

    pub async fn cleanup_reservations(&self) -> Result<usize, ReservationError> {
        self.cleanup_reservations_at(now_epoch_ms()).await
    }

    /// 删除所有 `until < now` 的预约，返回删除数量。
    pub async fn cleanup_reservations_at(&self, now_ms: i64) -> Result<usize, ReservationError> {
        let past = self.reservations.list_past(now_ms).await?;
        let mut removed = 0usize;
        for reservation in past {
            let _guard = self
                .registry
                .locks()
                .acquire(&reservation.resource_id)
                .await;
            match self
                .reservations
                .delete_reservation(&reservation.reservation_id)
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(
                        target: "iot.reservation",
                        reservation_id = %reservation.reservation_id,
                        error = %err,
                        "reservation_expire_failed"
                    );
                    continue;
                }
            }
            removed += 1;
            info!(
                target: "iot.reservation",
                reservation_id = %reservation.reservation_id,
                resource_id = %reservation.resource_id,
                user_id = %reservation.user_id,
                until_ms = reservation.until_ms,
                "reservation_expired"
            );
            self.audit(
                stable_expire_audit_id(&reservation.reservation_id),
                SYSTEM_ACTOR,
                "EXPIRE",
                &reservation.reservation_id,
                Some(reservation.resource_id.clone()),
            )
            .await;
        }
        if removed > 0 {
            record_reservations_expired(removed as u64);
        }
        Ok(removed)
    }

    /// 用户在资源上当前生效的槽位。
    pub async fn active_slot(
        &self,
        resource_id: &str,
        user_id: &str,
    ) -> Result<Option<u32>, ReservationError> {
        self.active_slot_at(resource_id, user_id, now_epoch_ms())
            .await
    }

    pub async fn active_slot_at(
        &self,
        resource_id: &str,
        user_id: &str,
        now_ms: i64,
    ) -> Result<Option<u32>, ReservationError> {
        let _guard = self.registry.locks().acquire(resource_id).await;
        let existing = self.reservations.list_for_resource(resource_id).await?;
        Ok(active_slot_for_user(
            user_id,
            &existing,
            now_ms,
            self.config.active_grace_ms,
        ))
    }

    /// 某一时刻资源上被占用的槽位号。
    pub async fn slots_in_use(
        &self,
        resource_id: &str,
        now_ms: i64,
    ) -> Result<Vec<u32>, ReservationError> {
        let existing = self.reservations.list_for_resource(resource_id).await?;
        Ok(slots_at(&existing, now_ms))
    }

    pub async fn reservations_for_resource(
        &self,
        ctx: &ActorContext,
        resource_id: &str,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        let resource = self.require_resource(resource_id).await?;
        self.authorizer.authorize(
            ctx,
            AccessOp::Read,
            &AccessTarget::resource(&resource.department_id),
        )?;
        Ok(self.reservations.list_for_resource(resource_id).await?)
    }

    /// 用户的预约；调用方无权读取的条目被过滤。
    pub async fn reservations_for_user(
        &self,
        ctx: &ActorContext,
        user_id: &str,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        let items = self.reservations.list_for_user(user_id).await?;
        let mut departments: HashMap<String, Option<String>> = HashMap::new();
        let mut visible = Vec::with_capacity(items.len());
        for item in items {
            if !departments.contains_key(&item.resource_id) {
                let department = self
                    .registry
                    .load(&item.resource_id)
                    .await?
                    .map(|resource| resource.department_id);
                departments.insert(item.resource_id.clone(), department);
            }
            let Some(Some(department_id)) = departments.get(&item.resource_id) else {
                continue;
            };
            let target = AccessTarget::reservation(department_id, &item.user_id);
            if self.authorizer.can_read(ctx, &target) {
                visible.push(item);
            }
        }
        Ok(visible)
    }

    pub async fn reservations_for_department(
        &self,
        ctx: &ActorContext,
        department_id: &str,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        self.authorizer.authorize(
            ctx,
            AccessOp::Read,
            &AccessTarget::resource(department_id),
        )?;
        let resources = self.registry.list_department(department_id).await?;
        self.collect_for(&resources).await
    }

    pub async fn reservations_for_group(
        &self,
        ctx: &ActorContext,
        department_id: &str,
        group: &str,
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        self.authorizer.authorize(
            ctx,
            AccessOp::Read,
            &AccessTarget::resource(department_id),
        )?;
        let resources = self.registry.list_group(department_id, group).await?;
        self.collect_for(&resources).await
    }

    async fn collect_for(
        &self,
        resources: &[ResourceRecord],
    ) -> Result<Vec<ReservationRecord>, ReservationError> {
        let mut items = Vec::new();
        for resource in resources {
            items.extend(
                self.reservations
                    .list_for_resource(&resource.resource_id)
                    .await?,
            );
        }
        items.sort_by_key(|item| (item.from_ms, item.slot_number));
        Ok(items)
    }

    async fn require_resource(&self, resource_id: &str) -> Result<ResourceRecord, ReservationError> {
        self.registry
            .load(resource_id)
            .await?
            .ok_or_else(|| ReservationError::UnknownResource(resource_id.to_string()))
    }

    async fn audit(
        &self,
        audit_id: String,
        actor: &str,
        action: &str,
        object_id: &str,
        message: Option<String>,
    ) {
        let actor = if actor.is_empty() { SYSTEM_ACTOR } else { actor };
        let record = AuditLogRecord {
            audit_id,
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

fn stable_expire_audit_id(reservation_id: &str) -> String {
    let name = format!("audit:reservation:expire:{}", reservation_id);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}
