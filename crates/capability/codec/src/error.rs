//! 编解码错误类型定义

/// 报文解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// 报文不符合语法（字段数、UUID、数值等）
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl CodecError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}
