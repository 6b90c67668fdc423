//! 预约内存存储实现
//!
//! 仅用于本地演示和测试。

use crate::error::StorageError;
use crate::models::ReservationRecord;
use crate::traits::ReservationStore;
use crate::validation::ensure_reservation;
use std::collections::HashMap;
use std::sync::RwLock;

/// 预约内存存储
pub struct InMemoryReservationStore {
    reservations: RwLock<HashMap<String, ReservationRecord>>,
}

impl InMemoryReservationStore {
    /// 创建新的预约存储
    pub fn new() -> Self {
        Self {
            reservations: RwLock::new(HashMap::new()),
        }
    }

    fn filtered<F>(&self, predicate: F) -> Result<Vec<ReservationRecord>, StorageError>
    where
        F: Fn(&ReservationRecord) -> bool,
    {
        let map = self
            .reservations
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<ReservationRecord> =
            map.values().filter(|item| predicate(item)).cloned().collect();
        items.sort_by(|a, b| {
            a.from_ms
                .cmp(&b.from_ms)
                .then_with(|| a.slot_number.cmp(&b.slot_number))
        });
        Ok(items)
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn list_for_resource(
        &self,
        resource_id: &str,
    ) -> Result<Vec<ReservationRecord>, StorageError> {
        self.filtered(|item| item.resource_id == resource_id)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ReservationRecord>, StorageError> {
        self.filtered(|item| item.user_id == user_id)
    }

    async fn find_reservation(
        &self,
        reservation_id: &str,
    ) -> Result<Option<ReservationRecord>, StorageError> {
        let item = self
            .reservations
            .read()
            .ok()
            .and_then(|map| map.get(reservation_id).cloned());
        Ok(item)
    }

    async fn create_reservation(
        &self,
        record: ReservationRecord,
    ) -> Result<ReservationRecord, StorageError> {
        ensure_reservation(&record)?;
        let mut map = self
            .reservations
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if map.contains_key(&record.reservation_id) {
            return Err(StorageError::new("reservation exists"));
        }
        map.insert(record.reservation_id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_reservation(&self, reservation_id: &str) -> Result<bool, StorageError> {
        let mut map = self
            .reservations
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.remove(reservation_id).is_some())
    }

    async fn delete_for_resource(&self, resource_id: &str) -> Result<u64, StorageError> {
        let mut map = self
            .reservations
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let before = map.len();
        map.retain(|_, item| item.resource_id != resource_id);
        Ok((before - map.len()) as u64)
    }

    async fn list_past(&self, now_ms: i64) -> Result<Vec<ReservationRecord>, StorageError> {
        self.filtered(|item| item.window().has_elapsed(now_ms))
    }
}
