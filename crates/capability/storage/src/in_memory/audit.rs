//! 审计日志内存实现
//!
//! 仅用于本地测试和占位。

use crate::error::StorageError;
use crate::models::AuditLogRecord;
use crate::traits::AuditLogStore;
use crate::validation::ensure_non_empty;
use std::sync::RwLock;

/// 审计日志内存存储
pub struct InMemoryAuditLogStore {
    logs: RwLock<Vec<AuditLogRecord>>,
}

impl InMemoryAuditLogStore {
    /// 创建新的审计日志存储
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAuditLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn create_audit_log(
        &self,
        record: AuditLogRecord,
    ) -> Result<AuditLogRecord, StorageError> {
        ensure_non_empty("audit_id", &record.audit_id)?;
        let mut logs = self
            .logs
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        logs.push(record.clone());
        Ok(record)
    }

    async fn list_audit_logs(
        &self,
        object_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditLogRecord>, StorageError> {
        let limit = limit.max(0) as usize;
        let logs = self
            .logs
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<AuditLogRecord> = logs
            .iter()
            .filter(|item| match object_id {
                Some(object_id) => item.object_id == object_id,
                None => true,
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        if limit > 0 && items.len() > limit {
            items.truncate(limit);
        }
        Ok(items)
    }
}
