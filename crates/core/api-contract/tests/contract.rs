use api_contract::{HealthDto, MetricsSnapshotDto};

#[test]
fn health_dto_is_camel_case() {
    let dto = HealthDto {
        ok: true,
        storage: "memory".to_string(),
        mqtt_enabled: true,
        mqtt_state: Some("connected".to_string()),
    };
    let value = serde_json::to_value(dto).expect("serialize");
    assert_eq!(value["mqttEnabled"], true);
    assert_eq!(value["mqttState"], "connected");
    assert!(value.get("mqtt_state").is_none());
}

#[test]
fn metrics_dto_is_camel_case() {
    let dto = MetricsSnapshotDto {
        messages_received: 3,
        discovery_messages: 1,
        status_messages: 2,
        data_messages: 0,
        dropped_malformed: 0,
        dropped_unknown_device: 0,
        backpressure: 0,
        resources_registered: 1,
        resources_removed: 0,
        devices_timed_out: 0,
        reservations_created: 0,
        reservations_rejected: 0,
        reservations_expired: 0,
        commands_relayed: 0,
        command_publish_failure: 0,
        reconnects: 0,
    };
    let value = serde_json::to_value(dto).expect("serialize");
    assert_eq!(value["messagesReceived"], 3);
    assert_eq!(value["resourcesRegistered"], 1);
    assert!(value.get("dropped_malformed").is_none());
}
