use iot_access::PermissionDenied;
use iot_storage::StorageError;

/// 设备注册表错误。
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown department token: {0}")]
    UnknownDepartment(String),
    #[error("resource name already used in group {group}: {name}")]
    DuplicateName { group: String, name: String },
    #[error("max slots must be at least 1")]
    InvalidSlots,
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError::Storage(err.to_string())
    }
}
