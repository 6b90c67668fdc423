use iot_access::PermissionDenied;
use iot_registry::RegistryError;
use iot_storage::StorageError;

/// 预约错误。
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    /// 时间窗内已无空闲槽位（明确的否定结果，不自动重试）
    #[error("no free slot on resource {resource_id}")]
    NoFreeSlot { resource_id: String },
    #[error("invalid reservation window: {from_ms}..{until_ms}")]
    InvalidWindow { from_ms: i64, until_ms: i64 },
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("reservation not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for ReservationError {
    fn from(err: StorageError) -> Self {
        ReservationError::Storage(err.to_string())
    }
}

impl From<RegistryError> for ReservationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(resource_id) => ReservationError::UnknownResource(resource_id),
            RegistryError::PermissionDenied(denied) => ReservationError::PermissionDenied(denied),
            other => ReservationError::Storage(other.to_string()),
        }
    }
}
