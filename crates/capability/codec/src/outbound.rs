//! 下行报文编码：命令、设备应答、SCANRESULT。

/// 命令未带参数时使用的参数值。
pub const DEFAULT_COMMAND_PARAM: &str = "0";

pub const SCAN_RESULT_PREFIX: &str = "SCANRESULT";

/// 发往设备接收 topic 的应答。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAck {
    Registered,
    Unregistered,
    Online,
    Offline,
}

impl DeviceAck {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAck::Registered => "REGISTERED",
            DeviceAck::Unregistered => "UNREGISTERED",
            DeviceAck::Online => "ONLINE",
            DeviceAck::Offline => "OFFLINE",
        }
    }
}

/// SCANRESULT 中的一项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub max_slots: u32,
}

/// `{uuid}/{suffix}`
pub fn device_topic(uuid: &str, suffix: &str) -> String {
    format!("{}/{}", uuid, suffix.trim_start_matches('/'))
}

/// SCANRESULT 回复 topic：`{uuid}/read`。
pub fn scan_reply_topic(uuid: &str) -> String {
    device_topic(uuid, "read")
}

/// 命令报文：`{command};{param}:{slot}`。
pub fn encode_command(command: &str, param: Option<&str>, slot: u32) -> String {
    format!(
        "{};{}:{}",
        command,
        param.unwrap_or(DEFAULT_COMMAND_PARAM),
        slot
    )
}

/// `SCANRESULT:{uuid};{name};{description};{maxSlots}:...`
pub fn encode_scan_result(entries: &[ScanEntry]) -> String {
    let mut payload = String::from(SCAN_RESULT_PREFIX);
    for entry in entries {
        payload.push_str(&format!(
            ":{};{};{};{}",
            entry.uuid, entry.name, entry.description, entry.max_slots
        ));
    }
    payload
}
