use domain::{ActorContext, TimeWindow, permissions};

#[test]
fn actor_context_builds() {
    let ctx = ActorContext::new(
        "user-1",
        vec!["operator".to_string()],
        vec![permissions::RESOURCE_READ.to_string()],
        Some("dept-1".to_string()),
    );

    assert_eq!(ctx.user_id, "user-1");
    assert!(ctx.has_role("operator"));
    assert!(!ctx.has_role(permissions::ROLE_ADMIN));
    assert!(ctx.has_permission(permissions::RESOURCE_READ));
    assert_eq!(ctx.department_scope.as_deref(), Some("dept-1"));
}

#[test]
fn system_context_is_admin() {
    let ctx = ActorContext::system();
    assert_eq!(ctx.user_id, domain::SYSTEM_ACTOR);
    assert!(ctx.has_role(permissions::ROLE_ADMIN));
    assert!(ctx.department_scope.is_none());
}

#[test]
fn touching_windows_overlap() {
    let morning = TimeWindow::new(10, 11);
    let noon = TimeWindow::new(11, 12);
    assert!(morning.intersects(&noon));
    assert!(noon.intersects(&morning));
}

#[test]
fn disjoint_windows_do_not_overlap() {
    let first = TimeWindow::new(0, 10);
    let later = TimeWindow::new(20, 30);
    assert!(!first.intersects(&later));
    assert!(!later.intersects(&first));
}

#[test]
fn window_validity_and_elapsed() {
    assert!(TimeWindow::new(0, 1).is_valid());
    assert!(!TimeWindow::new(5, 5).is_valid());
    assert!(TimeWindow::new(0, 10).has_elapsed(11));
    assert!(!TimeWindow::new(0, 10).has_elapsed(10));
}
