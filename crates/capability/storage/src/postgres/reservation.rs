//! Postgres 预约存储实现

use crate::error::StorageError;
use crate::models::ReservationRecord;
use crate::traits::ReservationStore;
use crate::validation::ensure_reservation;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

pub struct PgReservationStore {
    pub pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn reservation_from_row(row: &PgRow) -> Result<ReservationRecord, StorageError> {
    let slot_number: i32 = row.try_get("slot_number")?;
    Ok(ReservationRecord {
        reservation_id: row.try_get("reservation_id")?,
        resource_id: row.try_get("resource_id")?,
        user_id: row.try_get("user_id")?,
        from_ms: row.try_get("from_ms")?,
        until_ms: row.try_get("until_ms")?,
        slot_number: u32::try_from(slot_number)
            .map_err(|_| StorageError::new("negative slot_number"))?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

fn reservations_from_rows(rows: Vec<PgRow>) -> Result<Vec<ReservationRecord>, StorageError> {
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(reservation_from_row(&row)?);
    }
    Ok(items)
}

#[async_trait::async_trait]
impl ReservationStore for PgReservationStore {
    async fn list_for_resource(
        &self,
        resource_id: &str,
    ) -> Result<Vec<ReservationRecord>, StorageError> {
        let rows = sqlx::query(
            "select reservation_id, resource_id, user_id, from_ms, until_ms, slot_number, \
             created_at_ms from reservations where resource_id = $1 \
             order by from_ms, slot_number",
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;
        reservations_from_rows(rows)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ReservationRecord>, StorageError> {
        let rows = sqlx::query(
            "select reservation_id, resource_id, user_id, from_ms, until_ms, slot_number, \
             created_at_ms from reservations where user_id = $1 order by from_ms",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        reservations_from_rows(rows)
    }

    async fn find_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Option<ReservationRecord>, StorageError> {
        let row = sqlx::query(
            "select reservation_id, resource_id, user_id, from_ms, until_ms, slot_number, \
             created_at_ms from reservations where reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(reservation_from_row(&row)?))
    }

    async fn create_reservation(
        &self,
        record: ReservationRecord,
    ) -> Result<ReservationRecord, StorageError> {
        ensure_reservation(&record)?;
        let slot_number = i32::try_from(record.slot_number)
            .map_err(|_| StorageError::new("slot_number out of range"))?;
        sqlx::query(
            "insert into reservations \
             (reservation_id, resource_id, user_id, from_ms, until_ms, slot_number, created_at_ms) \
             values ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.reservation_id)
        .bind(&record.resource_id)
        .bind(&record.user_id)
        .bind(record.from_ms)
        .bind(record.until_ms)
        .bind(slot_number)
        .bind(record.created_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete_reservation(&self, reservation_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from reservations where reservation_id = $1")
            .bind(reservation_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_resource(&self, resource_id: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("delete from reservations where resource_id = $1")
            .bind(resource_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_past(&self, now_ms: i64) -> Result<Vec<ReservationRecord>, StorageError> {
        let rows = sqlx::query(
            "select reservation_id, resource_id, user_id, from_ms, until_ms, slot_number, \
             created_at_ms from reservations where until_ms < $1 order by until_ms",
        )
        .bind(now_ms)
        .fetch_all(&self.pool)
        .await?;
        reservations_from_rows(rows)
    }
}
