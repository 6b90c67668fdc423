//! 槽位计算（纯函数）。
//!
//! 两个时间窗只要端点相接即视为重叠，见 [`TimeWindow::intersects`]。

use domain::TimeWindow;
use iot_storage::ReservationRecord;

/// 与时间窗重叠的预约。
pub fn overlapping<'a>(
    reservations: &'a [ReservationRecord],
    window: &TimeWindow,
) -> Vec<&'a ReservationRecord> {
    reservations
        .iter()
        .filter(|item| item.window().intersects(window))
        .collect()
}

/// 时间窗内剩余的槽位数（可能为负：槽位数被调小后的历史预约）。
pub fn free_slots(max_slots: u32, reservations: &[ReservationRecord], window: &TimeWindow) -> i64 {
    i64::from(max_slots) - overlapping(reservations, window).len() as i64
}

/// 为新预约分配槽位。
///
/// 单槽位资源固定返回 0；否则返回重叠预约未占用的最小槽位号。
pub fn allocate_slot(
    max_slots: u32,
    reservations: &[ReservationRecord],
    window: &TimeWindow,
) -> Option<u32> {
    if free_slots(max_slots, reservations, window) <= 0 {
        return None;
    }
    if max_slots == 1 {
        return Some(0);
    }
    let taken = overlapping(reservations, window);
    // 最小空闲槽位必然落在前 `taken.len() + 1` 个位置内
    let len = (max_slots as usize).min(taken.len() + 1);
    let mut occupied = vec![false; len];
    for item in taken {
        if let Some(slot) = occupied.get_mut(item.slot_number as usize) {
            *slot = true;
        }
    }
    occupied
        .iter()
        .position(|used| !used)
        .map(|index| index as u32)
}

fn active_window(now_ms: i64, grace_ms: i64) -> TimeWindow {
    TimeWindow::new(now_ms, now_ms + grace_ms)
}

/// 用户当前生效预约的槽位（与 `[now, now + grace]` 重叠即视为生效）。
pub fn active_slot_for_user(
    user_id: &str,
    reservations: &[ReservationRecord],
    now_ms: i64,
    grace_ms: i64,
) -> Option<u32> {
    let window = active_window(now_ms, grace_ms);
    reservations
        .iter()
        .find(|item| item.user_id == user_id && item.window().intersects(&window))
        .map(|item| item.slot_number)
}

pub fn is_active_for_user(
    user_id: &str,
    reservations: &[ReservationRecord],
    now_ms: i64,
    grace_ms: i64,
) -> bool {
    active_slot_for_user(user_id, reservations, now_ms, grace_ms).is_some()
}

/// 某一时刻被占用的槽位号（升序）。
pub fn slots_at(reservations: &[ReservationRecord], now_ms: i64) -> Vec<u32> {
    let instant = TimeWindow::new(now_ms, now_ms);
    let mut slots: Vec<u32> = reservations
        .iter()
        .filter(|item| item.window().intersects(&instant))
        .map(|item| item.slot_number)
        .collect();
    slots.sort_unstable();
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(user_id: &str, from_ms: i64, until_ms: i64, slot_number: u32) -> ReservationRecord {
        ReservationRecord {
            reservation_id: format!("{}-{}", user_id, from_ms),
            resource_id: "res-1".to_string(),
            user_id: user_id.to_string(),
            from_ms,
            until_ms,
            slot_number,
            created_at_ms: 0,
        }
    }

    #[test]
    fn lowest_free_slot_is_chosen() {
        let existing = vec![reservation("a", 0, 10, 1)];
        assert_eq!(allocate_slot(3, &existing, &TimeWindow::new(5, 15)), Some(0));
        let existing = vec![reservation("a", 0, 10, 0), reservation("b", 0, 10, 1)];
        assert_eq!(allocate_slot(3, &existing, &TimeWindow::new(5, 15)), Some(2));
        assert_eq!(allocate_slot(2, &existing, &TimeWindow::new(5, 15)), None);
    }

    #[test]
    fn huge_capacity_allocates_lowest_free_slot() {
        let existing = vec![reservation("a", 0, 10, 0), reservation("b", 0, 10, 2)];
        let window = TimeWindow::new(5, 8);
        assert_eq!(allocate_slot(u32::MAX, &existing, &window), Some(1));
        assert_eq!(allocate_slot(u32::MAX, &[], &window), Some(0));
        let full = vec![reservation("a", 0, 10, 0), reservation("b", 0, 10, 1)];
        assert_eq!(allocate_slot(u32::MAX, &full, &window), Some(2));
    }

    #[test]
    fn single_slot_always_uses_zero() {
        assert_eq!(allocate_slot(1, &[], &TimeWindow::new(0, 10)), Some(0));
        let existing = vec![reservation("a", 0, 10, 0)];
        assert_eq!(allocate_slot(1, &existing, &TimeWindow::new(20, 30)), Some(0));
    }

    #[test]
    fn touching_windows_consume_a_slot() {
        let existing = vec![reservation("a", 0, 10, 0)];
        assert_eq!(free_slots(1, &existing, &TimeWindow::new(10, 20)), 0);
    }

    #[test]
    fn active_slot_respects_grace() {
        let existing = vec![reservation("a", 100, 200, 1), reservation("b", 0, 50, 0)];
        assert_eq!(active_slot_for_user("a", &existing, 95, 10), Some(1));
        assert_eq!(active_slot_for_user("a", &existing, 80, 10), None);
        assert!(!is_active_for_user("b", &existing, 95, 10));
        assert_eq!(slots_at(&existing, 150), vec![1]);
    }
}
