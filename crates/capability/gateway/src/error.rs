/// 传输网关错误。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("subscribe error: {0}")]
    Subscribe(String),
    #[error("disconnect error: {0}")]
    Disconnect(String),
    #[error("registry error: {0}")]
    Registry(String),
}

impl From<iot_registry::RegistryError> for GatewayError {
    fn from(err: iot_registry::RegistryError) -> Self {
        GatewayError::Registry(err.to_string())
    }
}
