//! 数据模型
//!
//! 定义所有存储相关的数据模型和更新结构：
//! - 资源模型：ResourceRecord, ResourceUpdate（含联网设备状态）
//! - 数值序列：ValueSeries, ValueSample（按字节预算裁剪）
//! - 预约模型：ReservationRecord
//! - 部门模型：DepartmentRecord（外部目录只读）
//! - 审计模型：AuditLogRecord

use domain::TimeWindow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// 资源记录（可控设备或固定资产）。
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub resource_id: String,
    /// 联网设备的外部 UUID；普通资产为空。
    pub uuid: Option<String>,
    pub name: String,
    pub description: String,
    pub ip: Option<String>,
    /// 可同时预约的槽位数（不小于 1）。
    pub max_slots: u32,
    pub online: bool,
    pub last_ping_ms: i64,
    pub send_topic: Option<String>,
    pub receive_topic: Option<String>,
    /// 最近一次设备上报的原始数据
    pub data_received: Vec<u8>,
    /// 最近一次下发给设备的原始数据
    pub data_to_send: Vec<u8>,
    pub values: BTreeMap<String, ValueSeries>,
    pub commands: BTreeSet<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub department_id: String,
    pub resource_group: String,
    pub created_at_ms: i64,
}

impl ResourceRecord {
    /// 是否为通过消息代理接入的联网设备。
    pub fn is_network(&self) -> bool {
        self.uuid.is_some()
    }
}

/// 资源更新输入（None 表示不修改）。
#[derive(Debug, Clone, Default)]
pub struct ResourceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ip: Option<String>,
    pub max_slots: Option<u32>,
    pub online: Option<bool>,
    pub last_ping_ms: Option<i64>,
    pub data_received: Option<Vec<u8>>,
    pub data_to_send: Option<Vec<u8>>,
    pub values: Option<BTreeMap<String, ValueSeries>>,
    pub commands: Option<BTreeSet<String>>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl ResourceUpdate {
    /// 将更新应用到记录上（内存实现与测试共用）。
    pub fn apply_to(self, record: &mut ResourceRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(ip) = self.ip {
            record.ip = Some(ip);
        }
        if let Some(max_slots) = self.max_slots {
            record.max_slots = max_slots;
        }
        if let Some(online) = self.online {
            record.online = online;
        }
        if let Some(last_ping_ms) = self.last_ping_ms {
            record.last_ping_ms = last_ping_ms;
        }
        if let Some(data) = self.data_received {
            record.data_received = data;
        }
        if let Some(data) = self.data_to_send {
            record.data_to_send = data;
        }
        if let Some(values) = self.values {
            record.values = values;
        }
        if let Some(commands) = self.commands {
            record.commands = commands;
        }
        if let Some(latitude) = self.latitude {
            record.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            record.longitude = Some(longitude);
        }
    }
}

/// 单个数值样本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSample {
    pub ts_ms: i64,
    pub value: String,
}

impl ValueSample {
    fn encoded_len(&self) -> usize {
        self.ts_ms.to_string().len() + 1 + self.value.len()
    }
}

/// 命名数值的历史序列。
///
/// 文本编码为 `ts,value;ts,value...`，编码长度超过字节预算时从最旧的样本开始丢弃，
/// 最新样本始终保留。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSeries {
    samples: VecDeque<ValueSample>,
}

impl ValueSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加样本并按字节预算裁剪。
    pub fn push(&mut self, ts_ms: i64, value: impl Into<String>, max_bytes: usize) {
        self.samples.push_back(ValueSample {
            ts_ms,
            value: value.into(),
        });
        while self.samples.len() > 1 && self.encoded_len() > max_bytes {
            self.samples.pop_front();
        }
    }

    pub fn last(&self) -> Option<&ValueSample> {
        self.samples.back()
    }

    pub fn samples(&self) -> impl Iterator<Item = &ValueSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn encoded_len(&self) -> usize {
        let separators = self.samples.len().saturating_sub(1);
        self.samples
            .iter()
            .map(ValueSample::encoded_len)
            .sum::<usize>()
            + separators
    }

    /// `ts,value;ts,value...`
    pub fn encoded(&self) -> String {
        self.samples
            .iter()
            .map(|sample| format!("{},{}", sample.ts_ms, sample.value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// 预约记录：占用资源的一个槽位一段时间。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRecord {
    pub reservation_id: String,
    pub resource_id: String,
    pub user_id: String,
    pub from_ms: i64,
    pub until_ms: i64,
    /// 槽位号，取值 `[0, maxSlots)`。
    pub slot_number: u32,
    pub created_at_ms: i64,
}

impl ReservationRecord {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.from_ms, self.until_ms)
    }
}

/// 部门记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRecord {
    pub department_id: String,
    pub name: String,
    /// 设备发现报文中携带的部门令牌
    pub token: String,
}

/// 审计日志记录。
#[derive(Debug, Clone)]
pub struct AuditLogRecord {
    pub audit_id: String,
    pub actor: String,
    /// 对象类别，例如 `RESOURCE`、`RESERVATION`
    pub category: String,
    /// 动作，例如 `CREATE`、`DELETE`
    pub action: String,
    pub object_id: String,
    pub message: Option<String>,
    pub ts_ms: i64,
}
