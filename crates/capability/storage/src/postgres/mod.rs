//! # PostgreSQL 存储实现模块
//!
//! 本模块提供所有存储接口的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 查询使用参数绑定，防止 SQL 注入攻击
//! 2. **连接池管理**：使用连接池复用数据库连接
//! 3. **无授权逻辑**：授权在 registry / reservation 服务层完成，存储层只负责读写
//!
//! ## 包含的实现
//!
//! - **ResourceStore** (`resource.rs`)：资源与联网设备状态
//! - **ReservationStore** (`reservation.rs`)：预约记录
//! - **DepartmentDirectory** (`department.rs`)：部门令牌查询（只读）
//! - **AuditLogStore** (`audit.rs`)：审计日志
//!
//! ## 数据库模式要求
//!
//! 表结构见 `migrations/0001_iot_core.sql`（可通过 [`crate::ensure_schema`] 执行）：
//!
//! - `departments`：部门表（department_id, name, token）
//! - `resources`：资源表（resource_id, uuid, max_slots, online, last_ping_ms, value_series, commands ...）
//! - `reservations`：预约表（reservation_id, resource_id, user_id, from_ms, until_ms, slot_number）
//! - `audit_logs`：审计表（audit_id, actor, category, action, object_id, message, ts_ms）
//!
//! ### 索引
//! - `idx_resources_department`：按部门列出资源
//! - `idx_reservations_resource`：按资源读取预约（槽位计算）
//! - `idx_reservations_until`：过期清理
//!
//! ## 并发说明
//!
//! 槽位分配的串行化由服务层的按资源互斥锁保证，仅适用于单进程部署；
//! 多进程共享同一数据库时需要改为数据库行锁（`select ... for update`）。

pub mod audit;
pub mod department;
pub mod reservation;
pub mod resource;

// 导出到 crate 根目录，方便外部引用
pub use audit::*;
pub use department::*;
pub use reservation::*;
pub use resource::*;
