//! # 线协议编解码模块
//!
//! 设备与服务之间通过冒号分隔的文本报文交互：
//!
//! ```text
//! DISCOVERY            uuid:token:group:name:description:sendSuffix:receiveSuffix:maxSlots
//! {uuid}               KEYWORD[:arg...]           （状态指令）
//! {uuid}/WRITE         原始数据                    （数据上报）
//! {uuid}/{receive}     command;param:slot         （命令下发）
//! {uuid}/read          SCANRESULT:uuid;name;desc;slots:...
//! ```
//!
//! 本模块只负责报文与类型之间的转换，不访问存储，不做业务判断。
//! 解析失败统一返回 [`CodecError::Malformed`]，由调用方记录并丢弃。

pub mod discovery;
pub mod error;
pub mod outbound;
pub mod status;
pub mod topic;

pub use discovery::{DEFAULT_GROUP, DISCOVERY_FIELD_COUNT, DiscoveryMessage, parse_discovery};
pub use error::CodecError;
pub use outbound::{
    DEFAULT_COMMAND_PARAM, DeviceAck, SCAN_RESULT_PREFIX, ScanEntry, device_topic, encode_command,
    encode_scan_result, scan_reply_topic,
};
pub use status::{StatusCommand, parse_status};
pub use topic::{DISCOVERY_TOPIC, DataChannel, TopicKind, classify_topic, is_device_uuid};

/// 报文字段分隔符。
pub const FIELD_SEPARATOR: char = ':';
