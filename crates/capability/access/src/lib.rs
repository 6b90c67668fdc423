//! 授权能力：判定调用方能否对资源或预约执行某项操作。
//!
//! 拒绝以 [`PermissionDenied`] 错误值返回，不使用空值表示拒绝。

use domain::{ActorContext, permissions};
use std::fmt;

/// 操作类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Read,
    Create,
    Update,
    Delete,
}

impl fmt::Display for AccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            AccessOp::Read => "read",
            AccessOp::Create => "create",
            AccessOp::Update => "update",
            AccessOp::Delete => "delete",
        };
        write!(f, "{}", value)
    }
}

/// 授权目标。
#[derive(Debug, Clone, Copy)]
pub enum AccessTarget<'a> {
    Resource { department_id: &'a str },
    Reservation {
        department_id: &'a str,
        owner_id: &'a str,
    },
}

impl<'a> AccessTarget<'a> {
    pub fn resource(department_id: &'a str) -> Self {
        AccessTarget::Resource { department_id }
    }

    pub fn reservation(department_id: &'a str, owner_id: &'a str) -> Self {
        AccessTarget::Reservation {
            department_id,
            owner_id,
        }
    }

    pub fn department_id(&self) -> &'a str {
        match *self {
            AccessTarget::Resource { department_id } => department_id,
            AccessTarget::Reservation { department_id, .. } => department_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AccessTarget::Resource { .. } => "resource",
            AccessTarget::Reservation { .. } => "reservation",
        }
    }
}

/// 授权拒绝。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("permission denied: {user_id} cannot {op} {object} in department {department_id}")]
pub struct PermissionDenied {
    pub user_id: String,
    pub op: AccessOp,
    pub object: &'static str,
    pub department_id: String,
}

impl PermissionDenied {
    pub fn new(ctx: &ActorContext, op: AccessOp, target: &AccessTarget<'_>) -> Self {
        Self {
            user_id: ctx.user_id.clone(),
            op,
            object: target.kind(),
            department_id: target.department_id().to_string(),
        }
    }
}

/// 授权器接口。
pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        ctx: &ActorContext,
        op: AccessOp,
        target: &AccessTarget<'_>,
    ) -> Result<(), PermissionDenied>;

    fn can_read(&self, ctx: &ActorContext, target: &AccessTarget<'_>) -> bool {
        self.authorize(ctx, AccessOp::Read, target).is_ok()
    }

    fn can_create(&self, ctx: &ActorContext, target: &AccessTarget<'_>) -> bool {
        self.authorize(ctx, AccessOp::Create, target).is_ok()
    }

    fn can_update(&self, ctx: &ActorContext, target: &AccessTarget<'_>) -> bool {
        self.authorize(ctx, AccessOp::Update, target).is_ok()
    }

    fn can_delete(&self, ctx: &ActorContext, target: &AccessTarget<'_>) -> bool {
        self.authorize(ctx, AccessOp::Delete, target).is_ok()
    }
}

/// 基于权限码与部门范围的授权器。
///
/// - 管理员角色直接放行
/// - 其余调用方需要对应权限码，且部门范围（如有）与目标部门一致
/// - 预约的所有者可以读取和删除自己的预约
#[derive(Debug, Default)]
pub struct PermissionAuthorizer;

impl PermissionAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

fn permission_code(op: AccessOp, target: &AccessTarget<'_>) -> &'static str {
    match (target, op) {
        (AccessTarget::Resource { .. }, AccessOp::Read) => permissions::RESOURCE_READ,
        (AccessTarget::Resource { .. }, AccessOp::Create) => permissions::RESOURCE_CREATE,
        (AccessTarget::Resource { .. }, AccessOp::Update) => permissions::RESOURCE_UPDATE,
        (AccessTarget::Resource { .. }, AccessOp::Delete) => permissions::RESOURCE_DELETE,
        (AccessTarget::Reservation { .. }, AccessOp::Read) => permissions::RESERVATION_READ,
        (AccessTarget::Reservation { .. }, AccessOp::Create) => permissions::RESERVATION_CREATE,
        (AccessTarget::Reservation { .. }, AccessOp::Update) => permissions::RESERVATION_UPDATE,
        (AccessTarget::Reservation { .. }, AccessOp::Delete) => permissions::RESERVATION_DELETE,
    }
}

impl Authorizer for PermissionAuthorizer {
    fn authorize(
        &self,
        ctx: &ActorContext,
        op: AccessOp,
        target: &AccessTarget<'_>,
    ) -> Result<(), PermissionDenied> {
        if ctx.has_role(permissions::ROLE_ADMIN) {
            return Ok(());
        }
        if let AccessTarget::Reservation { owner_id, .. } = target {
            if matches!(op, AccessOp::Read | AccessOp::Delete)
                && !ctx.user_id.is_empty()
                && ctx.user_id == *owner_id
            {
                return Ok(());
            }
        }
        if let Some(scope) = ctx.department_scope.as_deref() {
            if scope != target.department_id() {
                return Err(PermissionDenied::new(ctx, op, target));
            }
        }
        if ctx.has_permission(permission_code(op, target)) {
            return Ok(());
        }
        Err(PermissionDenied::new(ctx, op, target))
    }
}

/// 放行所有请求（用于测试和无权限模型的部署）。
#[derive(Debug, Default)]
pub struct AllowAllAuthorizer;

impl Authorizer for AllowAllAuthorizer {
    fn authorize(
        &self,
        _ctx: &ActorContext,
        _op: AccessOp,
        _target: &AccessTarget<'_>,
    ) -> Result<(), PermissionDenied> {
        Ok(())
    }
}
