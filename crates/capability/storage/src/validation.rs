//! 验证辅助函数
//!
//! 写入前的数据一致性校验，内存实现与 PostgreSQL 实现共用：
//! - ensure_non_empty：必填字段非空
//! - ensure_max_slots：槽位数不小于 1
//! - ensure_reservation：预约窗口与槽位号合法

use crate::error::StorageError;
use crate::models::{ReservationRecord, ResourceRecord};

/// 验证必填字段非空
pub fn ensure_non_empty(field: &str, value: &str) -> Result<(), StorageError> {
    if value.trim().is_empty() {
        return Err(StorageError::new(format!("{} required", field)));
    }
    Ok(())
}

/// 验证槽位数
pub fn ensure_max_slots(max_slots: u32) -> Result<(), StorageError> {
    if max_slots < 1 {
        return Err(StorageError::new("max_slots must be at least 1"));
    }
    Ok(())
}

/// 验证资源记录可写入
pub fn ensure_resource(record: &ResourceRecord) -> Result<(), StorageError> {
    ensure_non_empty("resource_id", &record.resource_id)?;
    ensure_non_empty("department_id", &record.department_id)?;
    ensure_max_slots(record.max_slots)
}

/// 验证预约记录可写入
pub fn ensure_reservation(record: &ReservationRecord) -> Result<(), StorageError> {
    ensure_non_empty("reservation_id", &record.reservation_id)?;
    ensure_non_empty("resource_id", &record.resource_id)?;
    if !record.window().is_valid() {
        return Err(StorageError::new("reservation window is empty"));
    }
    Ok(())
}
