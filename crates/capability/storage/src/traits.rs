//! 存储接口 Trait 定义
//!
//! 定义核心所需的异步存储接口：
//! - ResourceStore：资源存储
//! - ReservationStore：预约存储
//! - DepartmentDirectory：部门目录（只读）
//! - AuditLogStore：审计日志
//!
//! 设计原则：
//! - 存储层不做授权判定，授权由调用方（registry / reservation）完成
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{
    AuditLogRecord, DepartmentRecord, ReservationRecord, ResourceRecord, ResourceUpdate,
};
use async_trait::async_trait;

/// 资源存储接口
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// 按内部 ID 查找资源
    async fn find_resource(&self, resource_id: &str)
    -> Result<Option<ResourceRecord>, StorageError>;

    /// 按设备 UUID 查找资源
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<ResourceRecord>, StorageError>;

    /// 列出所有资源
    async fn list_resources(&self) -> Result<Vec<ResourceRecord>, StorageError>;

    /// 列出所有联网设备的 UUID
    async fn list_network_uuids(&self) -> Result<Vec<String>, StorageError>;

    /// 列出在线的联网设备
    async fn list_online(&self) -> Result<Vec<ResourceRecord>, StorageError>;

    /// 列出部门下的资源
    async fn list_by_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<ResourceRecord>, StorageError>;

    /// 按（部门、分组、名称）查找资源
    async fn find_by_group_and_name(
        &self,
        department_id: &str,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ResourceRecord>, StorageError>;

    /// 创建资源（UUID 重复时报错）
    async fn create_resource(&self, record: ResourceRecord) -> Result<ResourceRecord, StorageError>;

    /// 更新资源
    async fn update_resource(
        &self,
        resource_id: &str,
        update: ResourceUpdate,
    ) -> Result<Option<ResourceRecord>, StorageError>;

    /// 删除资源
    async fn delete_resource(&self, resource_id: &str) -> Result<bool, StorageError>;
}

/// 预约存储接口
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// 列出资源的全部预约（按开始时间升序）
    async fn list_for_resource(
        &self,
        resource_id: &str,
    ) -> Result<Vec<ReservationRecord>, StorageError>;

    /// 列出用户的全部预约
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ReservationRecord>, StorageError>;

    /// 查找指定预约
    async fn find_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Option<ReservationRecord>, StorageError>;

    /// 创建预约
    async fn create_reservation(
        &self,
        record: ReservationRecord,
    ) -> Result<ReservationRecord, StorageError>;

    /// 删除预约
    async fn delete_reservation(&self, reservation_id: &str) -> Result<bool, StorageError>;

    /// 删除资源的全部预约，返回删除数量
    async fn delete_for_resource(&self, resource_id: &str) -> Result<u64, StorageError>;

    /// 列出已完全结束（`until < now`）的预约
    async fn list_past(&self, now_ms: i64) -> Result<Vec<ReservationRecord>, StorageError>;
}

/// 部门目录接口（部门由外部业务系统维护）
#[async_trait]
pub trait DepartmentDirectory: Send + Sync {
    /// 按令牌查找部门
    async fn find_by_token(&self, token: &str) -> Result<Option<DepartmentRecord>, StorageError>;

    /// 按 ID 查找部门
    async fn find_department(
        &self,
        department_id: &str,
    ) -> Result<Option<DepartmentRecord>, StorageError>;
}

/// 审计日志存储接口
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn create_audit_log(&self, record: AuditLogRecord)
    -> Result<AuditLogRecord, StorageError>;

    /// 按时间倒序列出审计日志（`limit <= 0` 表示不限）
    async fn list_audit_logs(
        &self,
        object_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditLogRecord>, StorageError>;
}
