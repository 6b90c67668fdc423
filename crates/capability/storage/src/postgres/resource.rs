//! Postgres 资源存储实现
//!
//! 通过 SQL 查询实现资源 CRUD 操作。
//!
//! 设计要点：
//! - 数值序列以 JSON 文本存放在 `value_series` 列
//! - 命令集合使用 `text[]`，原始数据使用 `bytea`
//! - 使用参数化 SQL 防止注入

use crate::error::StorageError;
use crate::models::{ResourceRecord, ResourceUpdate, ValueSeries};
use crate::traits::ResourceStore;
use crate::validation::ensure_resource;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, BTreeSet};

const RESOURCE_COLUMNS: &str = "resource_id, uuid, name, description, ip, max_slots, online, \
     last_ping_ms, send_topic, receive_topic, data_received, data_to_send, value_series, \
     commands, latitude, longitude, department_id, resource_group, created_at_ms";

pub struct PgResourceStore {
    pub pool: PgPool,
}

impl PgResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }

    async fn fetch_many(&self, sql: &str, bind: Option<&str>) -> Result<Vec<ResourceRecord>, StorageError> {
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(resource_from_row(&row)?);
        }
        Ok(items)
    }
}

fn resource_from_row(row: &PgRow) -> Result<ResourceRecord, StorageError> {
    let max_slots: i32 = row.try_get("max_slots")?;
    let value_series: String = row.try_get("value_series")?;
    let values: BTreeMap<String, ValueSeries> = if value_series.is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_str(&value_series)?
    };
    let commands: Vec<String> = row.try_get("commands")?;
    Ok(ResourceRecord {
        resource_id: row.try_get("resource_id")?,
        uuid: row.try_get("uuid")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        ip: row.try_get("ip")?,
        max_slots: u32::try_from(max_slots)
            .map_err(|_| StorageError::new("negative max_slots"))?,
        online: row.try_get("online")?,
        last_ping_ms: row.try_get("last_ping_ms")?,
        send_topic: row.try_get("send_topic")?,
        receive_topic: row.try_get("receive_topic")?,
        data_received: row.try_get("data_received")?,
        data_to_send: row.try_get("data_to_send")?,
        values,
        commands: commands.into_iter().collect::<BTreeSet<_>>(),
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        department_id: row.try_get("department_id")?,
        resource_group: row.try_get("resource_group")?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

fn slots_to_i32(max_slots: u32) -> Result<i32, StorageError> {
    i32::try_from(max_slots).map_err(|_| StorageError::new("max_slots out of range"))
}

#[async_trait::async_trait]
impl ResourceStore for PgResourceStore {
    async fn find_resource(
        &self,
        resource_id: &str,
    ) -> Result<Option<ResourceRecord>, StorageError> {
        let sql = format!("select {} from resources where resource_id = $1", RESOURCE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(resource_from_row(&row)?))
    }

    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<ResourceRecord>, StorageError> {
        let sql = format!("select {} from resources where uuid = $1", RESOURCE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(resource_from_row(&row)?))
    }

    async fn list_resources(&self) -> Result<Vec<ResourceRecord>, StorageError> {
        let sql = format!(
            "select {} from resources order by created_at_ms",
            RESOURCE_COLUMNS
        );
        self.fetch_many(&sql, None).await
    }

    async fn list_network_uuids(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("select uuid from resources where uuid is not null order by created_at_ms")
            .fetch_all(&self.pool)
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(row.try_get("uuid")?);
        }
        Ok(items)
    }

    async fn list_online(&self) -> Result<Vec<ResourceRecord>, StorageError> {
        let sql = format!(
            "select {} from resources where uuid is not null and online = true \
             order by created_at_ms",
            RESOURCE_COLUMNS
        );
        self.fetch_many(&sql, None).await
    }

    async fn list_by_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<ResourceRecord>, StorageError> {
        let sql = format!(
            "select {} from resources where department_id = $1 order by created_at_ms",
            RESOURCE_COLUMNS
        );
        self.fetch_many(&sql, Some(department_id)).await
    }

    async fn find_by_group_and_name(
        &self,
        department_id: &str,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ResourceRecord>, StorageError> {
        let sql = format!(
            "select {} from resources \
             where department_id = $1 and resource_group = $2 and name = $3",
            RESOURCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(department_id)
            .bind(resource_group)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(resource_from_row(&row)?))
    }

    async fn create_resource(&self, record: ResourceRecord) -> Result<ResourceRecord, StorageError> {
        ensure_resource(&record)?;
        let value_series = serde_json::to_string(&record.values)?;
        let commands: Vec<String> = record.commands.iter().cloned().collect();
        sqlx::query(
            "insert into resources \
             (resource_id, uuid, name, description, ip, max_slots, online, last_ping_ms, \
             send_topic, receive_topic, data_received, data_to_send, value_series, commands, \
             latitude, longitude, department_id, resource_group, created_at_ms) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(&record.resource_id)
        .bind(&record.uuid)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.ip)
        .bind(slots_to_i32(record.max_slots)?)
        .bind(record.online)
        .bind(record.last_ping_ms)
        .bind(&record.send_topic)
        .bind(&record.receive_topic)
        .bind(&record.data_received)
        .bind(&record.data_to_send)
        .bind(value_series)
        .bind(commands)
        .bind(&record.latitude)
        .bind(&record.longitude)
        .bind(&record.department_id)
        .bind(&record.resource_group)
        .bind(record.created_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_resource(
        &self,
        resource_id: &str,
        update: ResourceUpdate,
    ) -> Result<Option<ResourceRecord>, StorageError> {
        let max_slots = match update.max_slots {
            Some(value) => Some(slots_to_i32(value)?),
            None => None,
        };
        let value_series = match update.values.as_ref() {
            Some(values) => Some(serde_json::to_string(values)?),
            None => None,
        };
        let commands: Option<Vec<String>> = update
            .commands
            .map(|commands| commands.into_iter().collect());
        let sql = format!(
            "update resources set \
             name = coalesce($1, name), \
             description = coalesce($2, description), \
             ip = coalesce($3, ip), \
             max_slots = coalesce($4, max_slots), \
             online = coalesce($5, online), \
             last_ping_ms = coalesce($6, last_ping_ms), \
             data_received = coalesce($7, data_received), \
             data_to_send = coalesce($8, data_to_send), \
             value_series = coalesce($9, value_series), \
             commands = coalesce($10, commands), \
             latitude = coalesce($11, latitude), \
             longitude = coalesce($12, longitude) \
             where resource_id = $13 \
             returning {}",
            RESOURCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(update.name)
            .bind(update.description)
            .bind(update.ip)
            .bind(max_slots)
            .bind(update.online)
            .bind(update.last_ping_ms)
            .bind(update.data_received)
            .bind(update.data_to_send)
            .bind(value_series)
            .bind(commands)
            .bind(update.latitude)
            .bind(update.longitude)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(resource_from_row(&row)?))
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from resources where resource_id = $1")
            .bind(resource_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
