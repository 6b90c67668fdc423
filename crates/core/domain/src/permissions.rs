//! 权限码与内置角色。

/// 管理员角色：跳过权限码与部门范围判定。
pub const ROLE_ADMIN: &str = "admin";

pub const RESOURCE_READ: &str = "RESOURCE.READ";
pub const RESOURCE_CREATE: &str = "RESOURCE.CREATE";
pub const RESOURCE_UPDATE: &str = "RESOURCE.UPDATE";
pub const RESOURCE_DELETE: &str = "RESOURCE.DELETE";

pub const RESERVATION_READ: &str = "RESERVATION.READ";
pub const RESERVATION_CREATE: &str = "RESERVATION.CREATE";
pub const RESERVATION_UPDATE: &str = "RESERVATION.UPDATE";
pub const RESERVATION_DELETE: &str = "RESERVATION.DELETE";
