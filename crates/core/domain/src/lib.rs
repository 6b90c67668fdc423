pub mod data;
pub mod permissions;

pub use data::{InboundMessage, TimeWindow, now_epoch_ms};

/// 系统内部调用方标识（消息处理、定时清理）。
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// 调用方上下文：所有核心操作共享的身份与权限范围。
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    /// 限定可访问的部门；为空表示不限部门。
    pub department_scope: Option<String>,
}

impl ActorContext {
    /// 构造显式身份与权限范围的上下文。
    pub fn new(
        user_id: impl Into<String>,
        roles: Vec<String>,
        permissions: Vec<String>,
        department_scope: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
            permissions,
            department_scope,
        }
    }

    /// 系统上下文（管理员角色，不限部门）。
    pub fn system() -> Self {
        Self {
            user_id: SYSTEM_ACTOR.to_string(),
            roles: vec![permissions::ROLE_ADMIN.to_string()],
            permissions: Vec::new(),
            department_scope: None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|item| item == role)
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.iter().any(|item| item == code)
    }
}

impl Default for ActorContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            user_id: "".to_string(),
            roles: Vec::new(),
            permissions: Vec::new(),
            department_scope: None,
        }
    }
}
