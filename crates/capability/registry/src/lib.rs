//! # 设备注册表
//!
//! 负责资源（联网设备与普通资产）的生命周期：
//!
//! - 创建（按 UUID 幂等）、上线/离线、删除（级联预约）
//! - 命名数值历史、命令集合、坐标、收发数据缓冲
//! - 心跳超时检测（[`spawn_ping_timeout_job`]）
//!
//! 同一资源上的读改写通过 [`ResourceLocks`] 串行化，预约引擎共用同一张锁表。
//! 每次状态变化通过 [`EventNotifier`] 发出事件，写操作记录审计日志。

pub mod config;
pub mod error;
pub mod events;
pub mod jobs;
pub mod locks;
pub mod service;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use events::{BroadcastNotifier, EventNotifier, NoopNotifier, ResourceEvent, TracingNotifier};
pub use jobs::spawn_ping_timeout_job;
pub use locks::ResourceLocks;
pub use service::{DeviceRegistry, NewResource, Registration};
