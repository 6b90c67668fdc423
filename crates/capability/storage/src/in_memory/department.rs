//! 部门目录内存实现
//!
//! 仅用于本地演示和测试，内置默认部门。

use crate::error::StorageError;
use crate::models::DepartmentRecord;
use crate::traits::DepartmentDirectory;
use std::collections::HashMap;
use std::sync::RwLock;

/// 默认部门 ID（与建表脚本中的种子数据一致）
pub const DEFAULT_DEPARTMENT_ID: &str = "default";
/// 默认部门令牌
pub const DEFAULT_DEPARTMENT_TOKEN: &str = "default";

/// 部门目录内存存储
pub struct InMemoryDepartmentDirectory {
    departments: RwLock<HashMap<String, DepartmentRecord>>,
}

impl InMemoryDepartmentDirectory {
    pub fn new() -> Self {
        Self {
            departments: RwLock::new(HashMap::new()),
        }
    }

    /// 创建包含默认部门的目录
    pub fn with_default_department() -> Self {
        let directory = Self::new();
        if let Ok(mut map) = directory.departments.write() {
            map.insert(
                DEFAULT_DEPARTMENT_ID.to_string(),
                DepartmentRecord {
                    department_id: DEFAULT_DEPARTMENT_ID.to_string(),
                    name: "Default".to_string(),
                    token: DEFAULT_DEPARTMENT_TOKEN.to_string(),
                },
            );
        }
        directory
    }

    /// 写入部门（目录由外部系统维护，此处仅供装配与测试）
    pub fn insert(&self, record: DepartmentRecord) -> Result<(), StorageError> {
        let mut map = self
            .departments
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(record.department_id.clone(), record);
        Ok(())
    }
}

impl Default for InMemoryDepartmentDirectory {
    fn default() -> Self {
        Self::with_default_department()
    }
}

#[async_trait::async_trait]
impl DepartmentDirectory for InMemoryDepartmentDirectory {
    async fn find_by_token(&self, token: &str) -> Result<Option<DepartmentRecord>, StorageError> {
        let item = self.departments.read().ok().and_then(|map| {
            map.values().find(|item| item.token == token).cloned()
        });
        Ok(item)
    }

    async fn find_department(
        &self,
        department_id: &str,
    ) -> Result<Option<DepartmentRecord>, StorageError> {
        let item = self
            .departments
            .read()
            .ok()
            .and_then(|map| map.get(department_id).cloned());
        Ok(item)
    }
}
