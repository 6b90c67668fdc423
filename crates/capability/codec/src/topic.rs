//! Topic 分类：发现、状态、数据。

/// 设备发现 topic（匹配时忽略大小写）。
pub const DISCOVERY_TOPIC: &str = "DISCOVERY";

/// 数据 topic 的通道。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChannel {
    /// 设备上报数据（`{uuid}/WRITE`）
    Write,
    /// 设备读取通道（`{uuid}/read`）
    Read,
    Other(String),
}

/// 入站 topic 的类别。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicKind {
    Discovery,
    Status { uuid: String },
    Data { uuid: String, channel: DataChannel },
    Other,
}

/// 按 topic 形态分类。
pub fn classify_topic(topic: &str) -> TopicKind {
    let topic = topic.trim();
    if topic.eq_ignore_ascii_case(DISCOVERY_TOPIC) {
        return TopicKind::Discovery;
    }
    if let Some((uuid, mode)) = topic.split_once('/') {
        if uuid.is_empty() || mode.is_empty() {
            return TopicKind::Other;
        }
        let channel = if mode.eq_ignore_ascii_case("WRITE") {
            DataChannel::Write
        } else if mode.eq_ignore_ascii_case("READ") {
            DataChannel::Read
        } else {
            DataChannel::Other(mode.to_string())
        };
        return TopicKind::Data {
            uuid: uuid.to_string(),
            channel,
        };
    }
    if is_device_uuid(topic) {
        return TopicKind::Status {
            uuid: topic.to_string(),
        };
    }
    TopicKind::Other
}

/// 是否为合法的设备 UUID 文本。
pub fn is_device_uuid(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "3f2b8c1e-6a4d-4e8f-9b21-0c7d5e4a1f90";

    #[test]
    fn discovery_topic_is_case_insensitive() {
        assert_eq!(classify_topic("DISCOVERY"), TopicKind::Discovery);
        assert_eq!(classify_topic("discovery"), TopicKind::Discovery);
    }

    #[test]
    fn bare_uuid_is_status_topic() {
        assert_eq!(
            classify_topic(UUID),
            TopicKind::Status {
                uuid: UUID.to_string()
            }
        );
    }

    #[test]
    fn slash_topic_is_data() {
        let topic = format!("{}/write", UUID);
        assert_eq!(
            classify_topic(&topic),
            TopicKind::Data {
                uuid: UUID.to_string(),
                channel: DataChannel::Write
            }
        );
        let topic = format!("{}/cmd", UUID);
        assert!(matches!(
            classify_topic(&topic),
            TopicKind::Data {
                channel: DataChannel::Other(_),
                ..
            }
        ));
    }

    #[test]
    fn unrelated_topic_is_other() {
        assert_eq!(classify_topic("not-a-uuid"), TopicKind::Other);
        assert_eq!(classify_topic("/write"), TopicKind::Other);
    }
}
