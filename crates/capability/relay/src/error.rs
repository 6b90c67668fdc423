use iot_access::PermissionDenied;
use iot_registry::RegistryError;
use iot_reservation::ReservationError;

/// 命令中继错误。
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no active reservation for {user_id} on resource {resource_id}")]
    NoActiveReservation {
        user_id: String,
        resource_id: String,
    },
    #[error("resource is not a network device: {0}")]
    NotNetworkResource(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    #[error("publish error: {0}")]
    Publish(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RegistryError> for RelayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(resource_id) => RelayError::UnknownResource(resource_id),
            RegistryError::PermissionDenied(denied) => RelayError::PermissionDenied(denied),
            other => RelayError::Storage(other.to_string()),
        }
    }
}

impl From<ReservationError> for RelayError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::UnknownResource(resource_id) => {
                RelayError::UnknownResource(resource_id)
            }
            ReservationError::PermissionDenied(denied) => RelayError::PermissionDenied(denied),
            other => RelayError::Storage(other.to_string()),
        }
    }
}
