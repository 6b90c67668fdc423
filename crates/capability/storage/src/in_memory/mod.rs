//! 内存存储实现模块
//!
//! 仅用于本地演示和测试。
//!
//! 包含以下实现：
//! - ResourceStore: InMemoryResourceStore
//! - ReservationStore: InMemoryReservationStore
//! - DepartmentDirectory: InMemoryDepartmentDirectory
//! - AuditLogStore: InMemoryAuditLogStore

pub mod audit;
pub mod department;
pub mod reservation;
pub mod resource;

pub use audit::*;
pub use department::*;
pub use reservation::*;
pub use resource::*;
