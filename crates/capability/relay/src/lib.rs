//! # 命令中继
//!
//! 调用方持有资源上当前生效的预约时，按 `{command};{param}:{slot}` 格式
//! 向设备接收 topic 下发命令。发布通过 [`MessagePublisher`] 抽象，
//! 由传输网关提供实现。

pub mod error;
pub mod publisher;
pub mod relay;

pub use error::RelayError;
pub use publisher::{MessagePublisher, NoopPublisher, publish_with_retry};
pub use relay::{CommandRelay, RelayConfig};
