//! 设备发现报文解析。
//!
//! 格式：`uuid:departmentToken:group:name:description:sendSuffix:receiveSuffix:maxSlots`

use crate::FIELD_SEPARATOR;
use crate::error::CodecError;
use crate::outbound::device_topic;

/// 发现报文固定字段数。
pub const DISCOVERY_FIELD_COUNT: usize = 8;

/// 未指定分组时使用的资源分组名。
pub const DEFAULT_GROUP: &str = "default";

/// 解析后的设备发现报文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub uuid: String,
    /// 部门令牌；为空时由调用方决定是否回退到默认部门。
    pub department_token: Option<String>,
    pub group: String,
    pub name: String,
    pub description: String,
    /// `{uuid}/{sendSuffix}`
    pub send_topic: String,
    /// `{uuid}/{receiveSuffix}`
    pub receive_topic: String,
    pub max_slots: u32,
}

/// 解析发现报文。
///
/// 字段数必须为 8，uuid 必须合法，maxSlots 必须为不小于 1 的整数。
pub fn parse_discovery(payload: &str) -> Result<DiscoveryMessage, CodecError> {
    let payload = payload.trim();
    let fields: Vec<&str> = payload.split(FIELD_SEPARATOR).collect();
    if fields.len() != DISCOVERY_FIELD_COUNT {
        return Err(CodecError::malformed(format!(
            "discovery expects {} fields, got {}",
            DISCOVERY_FIELD_COUNT,
            fields.len()
        )));
    }

    let uuid = fields[0].trim();
    if uuid::Uuid::parse_str(uuid).is_err() {
        return Err(CodecError::malformed(format!("invalid device uuid: {}", uuid)));
    }

    let department_token = match fields[1].trim() {
        "" => None,
        token => Some(token.to_string()),
    };
    let group = match fields[2].trim() {
        "" => DEFAULT_GROUP.to_string(),
        group => group.to_string(),
    };
    let name = strip_separators(fields[3]);
    let description = strip_separators(fields[4]);

    let send_suffix = fields[5].trim();
    let receive_suffix = fields[6].trim();
    if send_suffix.is_empty() || receive_suffix.is_empty() {
        return Err(CodecError::malformed("empty topic suffix"));
    }

    let max_slots = fields[7]
        .trim()
        .parse::<u32>()
        .map_err(|_| CodecError::malformed(format!("invalid maxSlots: {}", fields[7])))?;
    if max_slots < 1 {
        return Err(CodecError::malformed("maxSlots must be at least 1"));
    }

    Ok(DiscoveryMessage {
        uuid: uuid.to_string(),
        department_token,
        group,
        name,
        description,
        send_topic: device_topic(uuid, send_suffix),
        receive_topic: device_topic(uuid, receive_suffix),
        max_slots,
    })
}

/// `;` 是 SCANRESULT 的字段分隔符，名称与描述中不得出现。
fn strip_separators(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| *ch != ';' && *ch != FIELD_SEPARATOR)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scan_separators() {
        assert_eq!(strip_separators(" lab;oven "), "laboven");
    }
}
