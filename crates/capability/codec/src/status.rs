//! 状态指令解析（topic 为设备 UUID）。
//!
//! 首个字段为关键字（大写，区分大小写），其余为关键字参数。
//! 参数个数在解析阶段一次校验完毕，不会产生半解析的指令。

use crate::FIELD_SEPARATOR;
use crate::error::CodecError;
use std::collections::BTreeSet;

/// 设备状态指令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCommand {
    /// 注销设备
    Remove,
    /// 设备上线
    Startup,
    /// 设备下线
    Shutdown,
    /// 追加命名数值（自动上线）
    Set { name: String, value: String },
    /// 删除命名数值及其历史
    Clear { name: String },
    /// 更新坐标
    Geo { latitude: String, longitude: String },
    /// 心跳
    Ping,
    /// 替换支持的命令集合
    Commands(BTreeSet<String>),
    /// 向另一台已注册设备转发命令
    SendCommand {
        target_uuid: String,
        command: String,
        param: Option<String>,
    },
    /// 预留
    GetCommands { target_uuid: String },
    /// 枚举同部门的其他联网设备
    ScanDevices {
        device_uuid: String,
        department_token: Option<String>,
    },
    /// 预留
    Slots,
    Unknown(String),
}

impl StatusCommand {
    /// 指令关键字（日志用）。
    pub fn keyword(&self) -> &str {
        match self {
            StatusCommand::Remove => "REMOVE",
            StatusCommand::Startup => "STARTUP",
            StatusCommand::Shutdown => "SHUTDOWN",
            StatusCommand::Set { .. } => "SET",
            StatusCommand::Clear { .. } => "CLEAR",
            StatusCommand::Geo { .. } => "GEO",
            StatusCommand::Ping => "PING",
            StatusCommand::Commands(_) => "COMMANDS",
            StatusCommand::SendCommand { .. } => "SENDCOMMAND",
            StatusCommand::GetCommands { .. } => "GETCOMMANDS",
            StatusCommand::ScanDevices { .. } => "SCANDEVICES",
            StatusCommand::Slots => "SLOTS",
            StatusCommand::Unknown(keyword) => keyword,
        }
    }
}

/// 解析状态指令。
pub fn parse_status(payload: &str) -> Result<StatusCommand, CodecError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(CodecError::malformed("empty status message"));
    }
    let mut parts = payload.split(FIELD_SEPARATOR);
    let keyword = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match keyword {
        "REMOVE" => StatusCommand::Remove,
        "STARTUP" => StatusCommand::Startup,
        "SHUTDOWN" => StatusCommand::Shutdown,
        "PING" => StatusCommand::Ping,
        "SLOTS" => StatusCommand::Slots,
        "SET" => {
            let name = required(&args, 0, "SET name")?;
            if args.len() < 2 {
                return Err(CodecError::malformed("SET expects name:value"));
            }
            // 数值本身可能包含分隔符，name 之后的内容整体作为数值
            StatusCommand::Set {
                name,
                value: args[1..].join(":"),
            }
        }
        "CLEAR" => StatusCommand::Clear {
            name: required(&args, 0, "CLEAR name")?,
        },
        "GEO" => StatusCommand::Geo {
            latitude: required(&args, 0, "GEO latitude")?,
            longitude: required(&args, 1, "GEO longitude")?,
        },
        "COMMANDS" => StatusCommand::Commands(
            args.iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty() && *item != "COMMANDS")
                .map(|item| item.to_string())
                .collect(),
        ),
        "SENDCOMMAND" => StatusCommand::SendCommand {
            target_uuid: required(&args, 0, "SENDCOMMAND target")?,
            command: required(&args, 1, "SENDCOMMAND command")?,
            param: optional(&args, 2),
        },
        "GETCOMMANDS" => StatusCommand::GetCommands {
            target_uuid: required(&args, 0, "GETCOMMANDS target")?,
        },
        "SCANDEVICES" => StatusCommand::ScanDevices {
            device_uuid: required(&args, 0, "SCANDEVICES device")?,
            department_token: optional(&args, 1),
        },
        other => StatusCommand::Unknown(other.to_string()),
    };
    Ok(command)
}

fn required(args: &[&str], index: usize, what: &str) -> Result<String, CodecError> {
    match args.get(index).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CodecError::malformed(format!("missing {}", what))),
    }
}

fn optional(args: &[&str], index: usize) -> Option<String> {
    args.get(index)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}
