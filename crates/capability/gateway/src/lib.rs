//! # 传输网关
//!
//! 维护与消息代理的连接并把入站消息分发到设备注册表和命令中继：
//!
//! - 连接状态 `Disconnected -> Connecting -> Connected`，通过 watch 通道发布
//! - 收到 CONNACK 后订阅发现 topic 与每台已注册设备的三个 topic
//! - 连接丢失后固定间隔重连，存活检查可提前唤醒重连
//! - 入站消息写入有界队列，由独立任务逐条处理；队列满时丢弃
//!
//! ```rust,ignore
//! let (link, eventloop) = MqttLink::new(&config);
//! let link = Arc::new(link);
//! let router = MessageRouter::new(registry, relay, link.clone(), link.clone(), options);
//! let handle = TransportGateway::new(config, router, link).start(eventloop);
//! // ...
//! handle.stop().await;
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod link;
pub mod router;
pub mod state;

pub use config::{GatewayConfig, qos_from_u8};
pub use error::GatewayError;
pub use gateway::{GatewayHandle, TransportGateway};
pub use link::{MqttLink, TopicSubscriber};
pub use router::{MessageRouter, RouterOptions};
pub use state::{ConnectionState, ConnectionTracker};
