//! # 预约引擎
//!
//! 在时间窗上为资源分配槽位：
//!
//! 1. 取资源锁，加载资源和它的全部预约
//! 2. 计算与新时间窗重叠的预约，剩余槽位不足时返回 [`ReservationError::NoFreeSlot`]
//! 3. 单槽位资源固定使用槽位 0，否则取最小的空闲槽位号
//! 4. 写入并记录审计，释放锁
//!
//! 已结束的预约由 [`spawn_cleanup_job`] 周期清理。

pub mod engine;
pub mod error;
pub mod jobs;
pub mod slots;

pub use engine::{ReservationConfig, ReservationEngine};
pub use error::ReservationError;
pub use jobs::spawn_cleanup_job;
pub use slots::{
    active_slot_for_user, allocate_slot, free_slots, is_active_for_user, overlapping, slots_at,
};
