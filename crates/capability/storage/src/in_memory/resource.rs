//! 资源内存存储实现
//!
//! 仅用于本地演示和测试。
//!
//! 功能：
//! - 资源 CRUD 操作
//! - 设备 UUID 唯一性校验
//! - 部门 / 在线状态过滤

use crate::error::StorageError;
use crate::models::{ResourceRecord, ResourceUpdate};
use crate::traits::ResourceStore;
use crate::validation::ensure_resource;
use std::collections::HashMap;
use std::sync::RwLock;

/// 资源内存存储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储。
pub struct InMemoryResourceStore {
    resources: RwLock<HashMap<String, ResourceRecord>>,
}

impl InMemoryResourceStore {
    /// 创建新的资源存储
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
        }
    }

    fn filtered<F>(&self, predicate: F) -> Result<Vec<ResourceRecord>, StorageError>
    where
        F: Fn(&ResourceRecord) -> bool,
    {
        let map = self
            .resources
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<ResourceRecord> =
            map.values().filter(|item| predicate(item)).cloned().collect();
        items.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(items)
    }
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn find_resource(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourceRecord>, StorageError> {
        let item = self
            .resources
            .read()
            .ok()
            .and_then(|map| map.get(resource_id).cloned());
        Ok(item)
    }

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<ResourceRecord>, StorageError> {
        let item = self.resources.read().ok().and_then(|map| {
            map.values()
                .find(|item| item.uuid.as_deref() == Some(uuid))
                .cloned()
        });
        Ok(item)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceRecord>, StorageError> {
        self.filtered(|_| true)
    }

    async fn list_network_uuids(&self) -> Result<Vec<String>, StorageError> {
        let items = self.filtered(|item| item.is_network())?;
        Ok(items.into_iter().filter_map(|item| item.uuid).collect())
    }

    async fn list_online(&self) -> Result<Vec<ResourceRecord>, StorageError> {
        self.filtered(|item| item.is_network() && item.online)
    }

    async fn list_by_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<ResourceRecord>, StorageError> {
        self.filtered(|item| item.department_id == department_id)
    }

    async fn find_by_group_and_name(
        &self,
        department_id: &str,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ResourceRecord>, StorageError> {
        let items = self.filtered(|item| {
            item.department_id == department_id
                && item.resource_group == resource_group
                && item.name == name
        })?;
        Ok(items.into_iter().next())
    }

    async fn create_resource(&self, record: ResourceRecord) -> Result<ResourceRecord, StorageError> {
        ensure_resource(&record)?;
        let mut map = self
            .resources
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if map.contains_key(&record.resource_id) {
            return Err(StorageError::new("resource exists"));
        }
        if let Some(uuid) = record.uuid.as_deref() {
            if map.values().any(|item| item.uuid.as_deref() == Some(uuid)) {
                return Err(StorageError::new("device uuid exists"));
            }
        }
        map.insert(record.resource_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_resource(
        &self,
        resource_id: &str,
        update: ResourceUpdate,
    ) -> Result<Option<ResourceRecord>, StorageError> {
        let mut map = self
            .resources
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let resource = match map.get_mut(resource_id) {
            Some(resource) => resource,
            None => return Ok(None),
        };
        update.apply_to(resource);
        Ok(Some(resource.clone()))
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<bool, StorageError> {
        let mut map = self
            .resources
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.remove(resource_id).is_some())
    }
}
