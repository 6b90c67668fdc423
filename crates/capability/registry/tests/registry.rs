use domain::{ActorContext, now_epoch_ms, permissions};
use iot_access::{AllowAllAuthorizer, PermissionAuthorizer};
use iot_registry::{
    BroadcastNotifier, DeviceRegistry, NewResource, RegistryConfig, RegistryError,
};
use iot_storage::{
    AuditLogStore, DEFAULT_DEPARTMENT_TOKEN, DepartmentRecord, InMemoryAuditLogStore,
    InMemoryDepartmentDirectory, InMemoryReservationStore, InMemoryResourceStore,
    ReservationRecord, ReservationStore, ResourceStore, ResourceUpdate,
};
use std::collections::BTreeSet;
use std::sync::Arc;

const UUID_A: &str = "3f2b8c1e-6a4d-4e8f-9b21-0c7d5e4a1f90";
const UUID_B: &str = "9a1c2d3e-4f50-4617-8a9b-0c1d2e3f4a5b";

struct Fixture {
    registry: DeviceRegistry,
    resources: Arc<InMemoryResourceStore>,
    reservations: Arc<InMemoryReservationStore>,
    audit: Arc<InMemoryAuditLogStore>,
}

fn fixture_with(config: RegistryConfig, authorizer_allows_all: bool) -> Fixture {
    let resources = Arc::new(InMemoryResourceStore::new());
    let reservations = Arc::new(InMemoryReservationStore::new());
    let audit = Arc::new(InMemoryAuditLogStore::new());
    let departments = Arc::new(InMemoryDepartmentDirectory::with_default_department());
    departments
        .insert(DepartmentRecord {
            department_id: "dept-lab".to_string(),
            name: "Lab".to_string(),
            token: "lab-token".to_string(),
        })
        .expect("insert");
    let registry = if authorizer_allows_all {
        DeviceRegistry::new(
            resources.clone(),
            reservations.clone(),
            departments,
            audit.clone(),
            Arc::new(AllowAllAuthorizer),
        )
    } else {
        DeviceRegistry::new(
            resources.clone(),
            reservations.clone(),
            departments,
            audit.clone(),
            Arc::new(PermissionAuthorizer::new()),
        )
    };
    Fixture {
        registry: registry.with_config(config),
        resources,
        reservations,
        audit,
    }
}

fn fixture() -> Fixture {
    fixture_with(RegistryConfig::default(), true)
}

fn device(uuid: &str, name: &str, token: &str, max_slots: u32) -> NewResource {
    NewResource {
        uuid: Some(uuid.to_string()),
        name: name.to_string(),
        description: "test device".to_string(),
        ip: None,
        group: "".to_string(),
        department_token: token.to_string(),
        max_slots,
        send_suffix: Some("send".to_string()),
        recv_suffix: Some("recv".to_string()),
    }
}

#[tokio::test]
async fn create_is_idempotent_on_uuid() {
    let fx = fixture();
    let ctx = ActorContext::system();
    let first = fx
        .registry
        .register(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 2))
        .await
        .expect("create");
    assert!(first.created);
    assert_eq!(first.resource.resource_group, "default");
    assert_eq!(
        first.resource.receive_topic.as_deref(),
        Some(format!("{}/recv", UUID_A).as_str())
    );
    assert!(!first.resource.online);
    assert!(first.resource.last_ping_ms > 0);

    let second = fx
        .registry
        .register(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 2))
        .await
        .expect("create");
    assert!(!second.created);
    assert_eq!(second.resource.resource_id, first.resource.resource_id);

    assert_eq!(fx.resources.list_resources().await.expect("list").len(), 1);
    let logs = fx.audit.list_audit_logs(None, 0).await.expect("audit");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "CREATE");
    assert!(fx.registry.exists(UUID_A).await.expect("exists"));
}

#[tokio::test]
async fn create_rejects_unknown_department_and_duplicates() {
    let fx = fixture();
    let ctx = ActorContext::system();
    let err = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", "missing", 1))
        .await
        .expect_err("unknown");
    assert!(matches!(err, RegistryError::UnknownDepartment(_)));

    let err = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 0))
        .await
        .expect_err("slots");
    assert!(matches!(err, RegistryError::InvalidSlots));

    fx.registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    let err = fx
        .registry
        .create(&ctx, device(UUID_B, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, RegistryError::DuplicateName { .. }));
}

#[tokio::test]
async fn set_value_marks_offline_device_online() {
    let fx = fixture();
    let ctx = ActorContext::system();
    let resource = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    assert!(!resource.online);

    let updated = fx
        .registry
        .set_value(&resource.resource_id, "temp", "21.5")
        .await
        .expect("set");
    assert!(updated.online);
    assert_eq!(
        fx.registry
            .last_value(&resource.resource_id, "temp")
            .await
            .expect("last"),
        Some("21.5".to_string())
    );

    let cleared = fx
        .registry
        .clear_value(&resource.resource_id, "temp")
        .await
        .expect("clear");
    assert!(cleared.values.is_empty());
}

#[tokio::test]
async fn value_series_respects_byte_budget_and_count() {
    let fx = fixture_with(
        RegistryConfig {
            max_value_bytes: 10,
            max_value_series: 1,
            ..Default::default()
        },
        true,
    );
    let ctx = ActorContext::system();
    let resource = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    let id = resource.resource_id.as_str();
    fx.registry.set_value_at(id, "temp", "aaaa", 1).await.expect("set");
    let updated = fx
        .registry
        .set_value_at(id, "temp", "bbbb", 2)
        .await
        .expect("set");
    let series = updated.values.get("temp").expect("series");
    assert_eq!(series.encoded(), "2,bbbb");

    let updated = fx
        .registry
        .set_value_at(id, "humidity", "40", 3)
        .await
        .expect("set");
    assert!(!updated.values.contains_key("humidity"));
}

#[tokio::test]
async fn online_transitions_raise_events() {
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let fx = fixture();
    let registry = fx.registry.clone().with_notifier(notifier.clone());
    let mut events = notifier.subscribe();
    let ctx = ActorContext::system();
    let resource = registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");

    registry
        .set_online(&resource.resource_id, true)
        .await
        .expect("online");
    let event = events.recv().await.expect("event");
    assert_eq!(event.property, "online");
    assert_eq!(event.old_value.as_deref(), Some("false"));
    assert_eq!(event.new_value.as_deref(), Some("true"));

    let offline = registry
        .set_offline(&resource.resource_id)
        .await
        .expect("offline");
    assert!(!offline.online);
    let again = registry
        .set_offline(&resource.resource_id)
        .await
        .expect("offline");
    assert!(!again.online);
}

#[tokio::test]
async fn commands_and_coordinates_are_stored() {
    let fx = fixture();
    let ctx = ActorContext::system();
    let resource = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    let id = resource.resource_id.as_str();
    let commands: BTreeSet<String> = ["ON", "OFF"].iter().map(|item| item.to_string()).collect();
    let updated = fx.registry.set_commands(id, commands).await.expect("commands");
    assert_eq!(updated.commands.len(), 2);

    let updated = fx
        .registry
        .set_coordinates(id, "48.1", "11.5")
        .await
        .expect("geo");
    assert_eq!(updated.latitude.as_deref(), Some("48.1"));
    assert_eq!(updated.longitude.as_deref(), Some("11.5"));

    let updated = fx
        .registry
        .write_data_received(id, b"raw".to_vec())
        .await
        .expect("data");
    assert_eq!(updated.data_received, b"raw".to_vec());
}

#[tokio::test]
async fn delete_cascades_reservations() {
    let fx = fixture();
    let ctx = ActorContext::system();
    let resource = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    fx.reservations
        .create_reservation(ReservationRecord {
            reservation_id: "r-1".to_string(),
            resource_id: resource.resource_id.clone(),
            user_id: "user-1".to_string(),
            from_ms: 0,
            until_ms: 10,
            slot_number: 0,
            created_at_ms: 0,
        })
        .await
        .expect("reservation");

    fx.registry
        .delete(&ctx, &resource.resource_id)
        .await
        .expect("delete");
    assert!(!fx.registry.exists(UUID_A).await.expect("exists"));
    assert!(
        fx.reservations
            .list_for_resource(&resource.resource_id)
            .await
            .expect("list")
            .is_empty()
    );
    let logs = fx.audit.list_audit_logs(Some(&resource.resource_id), 0).await.expect("audit");
    assert_eq!(logs.len(), 2);

    let err = fx
        .registry
        .delete(&ctx, &resource.resource_id)
        .await
        .expect_err("missing");
    assert!(matches!(err, RegistryError::NotFound(_)));
}

#[tokio::test]
async fn stale_devices_are_set_offline() {
    let fx = fixture_with(
        RegistryConfig {
            ping_timeout_ms: 1_000,
            ..Default::default()
        },
        true,
    );
    let ctx = ActorContext::system();
    let resource = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    let online = fx
        .registry
        .set_online(&resource.resource_id, true)
        .await
        .expect("online");

    let expired = fx
        .registry
        .expire_stale_pings(online.last_ping_ms + 500)
        .await
        .expect("sweep");
    assert_eq!(expired, 0);

    let expired = fx
        .registry
        .expire_stale_pings(online.last_ping_ms + 5_000)
        .await
        .expect("sweep");
    assert_eq!(expired, 1);
    let reloaded = fx
        .registry
        .load(&resource.resource_id)
        .await
        .expect("load")
        .expect("exists");
    assert!(!reloaded.online);
}

#[tokio::test]
async fn ping_after_snapshot_keeps_device_online() {
    let fx = fixture_with(
        RegistryConfig {
            ping_timeout_ms: 1_000,
            ..Default::default()
        },
        true,
    );
    let ctx = ActorContext::system();
    let resource = fx
        .registry
        .create(&ctx, device(UUID_A, "Oven", DEFAULT_DEPARTMENT_TOKEN, 1))
        .await
        .expect("create");
    fx.registry
        .set_online(&resource.resource_id, true)
        .await
        .expect("online");
    fx.resources
        .update_resource(
            &resource.resource_id,
            ResourceUpdate {
                last_ping_ms: Some(0),
                ..Default::default()
            },
        )
        .await
        .expect("age ping");
    let snapshot = fx.resources.list_online().await.expect("online");
    assert_eq!(snapshot[0].last_ping_ms, 0);

    // 快照之后到达的心跳
    fx.registry
        .record_ping(&resource.resource_id)
        .await
        .expect("ping");
    let now = now_epoch_ms() + 500;
    assert!(
        !fx.registry
            .expire_if_stale(&resource.resource_id, now)
            .await
            .expect("expire")
    );
    assert_eq!(fx.registry.expire_stale_pings(now).await.expect("sweep"), 0);
    let reloaded = fx
        .registry
        .load(&resource.resource_id)
        .await
        .expect("load")
        .expect("exists");
    assert!(reloaded.online);

    assert!(
        fx.registry
            .expire_if_stale(&resource.resource_id, now + 5_000)
            .await
            .expect("expire")
    );
}

#[tokio::test]
async fn department_siblings_exclude_requester() {
    let fx = fixture();
    let ctx = ActorContext::system();
    fx.registry
        .create(&ctx, device(UUID_A, "Oven", "lab-token", 1))
        .await
        .expect("create");
    fx.registry
        .create(&ctx, device(UUID_B, "Lamp", "lab-token", 3))
        .await
        .expect("create");

    let siblings = fx
        .registry
        .department_siblings(UUID_A, Some("lab-token"))
        .await
        .expect("siblings");
    assert_eq!(siblings.len(), 1);
    assert_eq!(siblings[0].uuid.as_deref(), Some(UUID_B));

    let empty = fx
        .registry
        .department_siblings(UUID_A, Some(DEFAULT_DEPARTMENT_TOKEN))
        .await
        .expect("siblings");
    assert!(empty.is_empty());

    let own = fx
        .registry
        .department_siblings(UUID_B, None)
        .await
        .expect("siblings");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].uuid.as_deref(), Some(UUID_A));
}

#[tokio::test]
async fn reads_are_authorized() {
    let fx = fixture_with(RegistryConfig::default(), false);
    let resource = fx
        .registry
        .create(
            &ActorContext::system(),
            device(UUID_A, "Oven", "lab-token", 1),
        )
        .await
        .expect("create");

    let reader = ActorContext::new(
        "user-1",
        vec![],
        vec![permissions::RESOURCE_READ.to_string()],
        Some("dept-lab".to_string()),
    );
    let found = fx
        .registry
        .find_resource(&reader, &resource.resource_id)
        .await
        .expect("find");
    assert!(found.is_some());

    let outsider = ActorContext::new(
        "user-2",
        vec![],
        vec![permissions::RESOURCE_READ.to_string()],
        Some("dept-other".to_string()),
    );
    let err = fx
        .registry
        .find_by_uuid(&outsider, UUID_A)
        .await
        .expect_err("denied");
    assert!(matches!(err, RegistryError::PermissionDenied(_)));
}
