//! Postgres 审计日志实现

use crate::error::StorageError;
use crate::models::AuditLogRecord;
use crate::traits::AuditLogStore;
use crate::validation::ensure_non_empty;
use sqlx::{PgPool, Row};

pub struct PgAuditLogStore {
    pub pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn create_audit_log(
        &self,
        record: AuditLogRecord,
    ) -> Result<AuditLogRecord, StorageError> {
        ensure_non_empty("audit_id", &record.audit_id)?;
        sqlx::query(
            "insert into audit_logs \
             (audit_id, actor, category, action, object_id, message, ts_ms) \
             values ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.audit_id)
        .bind(&record.actor)
        .bind(&record.category)
        .bind(&record.action)
        .bind(&record.object_id)
        .bind(&record.message)
        .bind(record.ts_ms)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_audit_logs(
        &self,
        object_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditLogRecord>, StorageError> {
        let limit = if limit > 0 { Some(limit) } else { None };
        let rows = sqlx::query(
            "select audit_id, actor, category, action, object_id, message, ts_ms \
             from audit_logs \
             where ($1::text is null or object_id = $1) \
             order by ts_ms desc \
             limit $2",
        )
        .bind(object_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(AuditLogRecord {
                audit_id: row.try_get("audit_id")?,
                actor: row.try_get("actor")?,
                category: row.try_get("category")?,
                action: row.try_get("action")?,
                object_id: row.try_get("object_id")?,
                message: row.try_get("message")?,
                ts_ms: row.try_get("ts_ms")?,
            });
        }
        Ok(items)
    }
}
