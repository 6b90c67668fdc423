use async_trait::async_trait;
use domain::InboundMessage;
use iot_access::AllowAllAuthorizer;
use iot_gateway::{GatewayError, MessageRouter, RouterOptions, TopicSubscriber};
use iot_registry::DeviceRegistry;
use iot_relay::{CommandRelay, MessagePublisher, RelayError};
use iot_reservation::ReservationEngine;
use iot_storage::{
    DEFAULT_DEPARTMENT_TOKEN, InMemoryAuditLogStore, InMemoryDepartmentDirectory,
    InMemoryReservationStore, InMemoryResourceStore, ResourceStore,
};
use std::sync::{Arc, Mutex};

const UUID_A: &str = "3f2b8c1e-6a4d-4e8f-9b21-0c7d5e4a1f90";
const UUID_B: &str = "9a1c2d3e-4f50-4617-8a9b-0c1d2e3f4a5b";

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    fn published(&self) -> Vec<(String, String)> {
        self.published.lock().expect("lock").clone()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RelayError> {
        self.published
            .lock()
            .expect("lock")
            .push((topic.to_string(), String::from_utf8_lossy(&payload).to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSubscriber {
    topics: Mutex<Vec<String>>,
}

#[async_trait]
impl TopicSubscriber for RecordingSubscriber {
    async fn subscribe(&self, topic: &str) -> Result<(), GatewayError> {
        self.topics.lock().expect("lock").push(topic.to_string());
        Ok(())
    }
}

struct Fixture {
    router: MessageRouter,
    registry: DeviceRegistry,
    resources: Arc<InMemoryResourceStore>,
    publisher: Arc<RecordingPublisher>,
    subscriber: Arc<RecordingSubscriber>,
}

fn fixture(options: RouterOptions) -> Fixture {
    let resources = Arc::new(InMemoryResourceStore::new());
    let reservations = Arc::new(InMemoryReservationStore::new());
    let audit = Arc::new(InMemoryAuditLogStore::new());
    let authorizer = Arc::new(AllowAllAuthorizer);
    let registry = DeviceRegistry::new(
        resources.clone(),
        reservations.clone(),
        Arc::new(InMemoryDepartmentDirectory::with_default_department()),
        audit.clone(),
        authorizer.clone(),
    );
    let engine = ReservationEngine::new(registry.clone(), reservations, audit, authorizer);
    let publisher = Arc::new(RecordingPublisher::default());
    let subscriber = Arc::new(RecordingSubscriber::default());
    let relay = CommandRelay::new(engine, publisher.clone());
    let router = MessageRouter::new(
        registry.clone(),
        relay,
        publisher.clone(),
        subscriber.clone(),
        options,
    );
    Fixture {
        router,
        registry,
        resources,
        publisher,
        subscriber,
    }
}

fn discovery(uuid: &str, token: &str, name: &str, max_slots: u32) -> InboundMessage {
    InboundMessage::new(
        "DISCOVERY",
        format!("{}:{}:lab:{}:a test device:send:recv:{}", uuid, token, name, max_slots),
    )
}

fn status(uuid: &str, payload: &str) -> InboundMessage {
    InboundMessage::new(uuid, payload.to_string())
}

#[tokio::test]
async fn discovery_is_idempotent() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 2))
        .await;
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 2))
        .await;

    let all = fx.resources.list_resources().await.expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].max_slots, 2);
    assert_eq!(all[0].resource_group, "lab");
    assert_eq!(
        fx.publisher.published(),
        vec![(format!("{}/recv", UUID_A), "REGISTERED".to_string())]
    );
    let topics = fx.subscriber.topics.lock().expect("lock").clone();
    assert_eq!(
        topics,
        vec![
            UUID_A.to_string(),
            format!("{}/send", UUID_A),
            format!("{}/recv", UUID_A),
        ]
    );
}

#[tokio::test]
async fn malformed_discovery_creates_nothing() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(InboundMessage::new("DISCOVERY", "uuid-only"))
        .await;
    assert!(fx.resources.list_resources().await.expect("list").is_empty());
    assert!(fx.publisher.published().is_empty());
}

#[tokio::test]
async fn missing_department_uses_fallback_only_when_enabled() {
    let fx = fixture(RouterOptions::default());
    fx.router.route(discovery(UUID_A, "", "Oven", 1)).await;
    assert!(fx.resources.list_resources().await.expect("list").is_empty());

    let fx = fixture(RouterOptions {
        default_department_token: Some(DEFAULT_DEPARTMENT_TOKEN.to_string()),
    });
    fx.router.route(discovery(UUID_A, "", "Oven", 1)).await;
    assert_eq!(fx.resources.list_resources().await.expect("list").len(), 1);
}

#[tokio::test]
async fn set_marks_device_online() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 1))
        .await;
    fx.router.route(status(UUID_A, "SET:temp:21.5")).await;

    let resource = fx
        .registry
        .resolve_uuid(UUID_A)
        .await
        .expect("resolve")
        .expect("exists");
    assert!(resource.online);
    assert_eq!(
        fx.registry
            .last_value(&resource.resource_id, "temp")
            .await
            .expect("last"),
        Some("21.5".to_string())
    );
}

#[tokio::test]
async fn lifecycle_commands_are_acknowledged() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 1))
        .await;
    fx.router.route(status(UUID_A, "STARTUP")).await;
    fx.router.route(status(UUID_A, "GEO:48.1:11.5")).await;
    fx.router.route(status(UUID_A, "COMMANDS:ON:OFF")).await;

    let resource = fx
        .registry
        .resolve_uuid(UUID_A)
        .await
        .expect("resolve")
        .expect("exists");
    assert!(resource.online);
    assert_eq!(resource.latitude.as_deref(), Some("48.1"));
    assert!(resource.commands.contains("ON"));

    fx.router.route(status(UUID_A, "SHUTDOWN")).await;
    fx.router.route(status(UUID_A, "REMOVE")).await;
    assert!(!fx.registry.exists(UUID_A).await.expect("exists"));

    let acks: Vec<String> = fx
        .publisher
        .published()
        .into_iter()
        .map(|(_, payload)| payload)
        .collect();
    assert_eq!(acks, vec!["REGISTERED", "ONLINE", "OFFLINE", "UNREGISTERED"]);
}

#[tokio::test]
async fn scan_and_forward_between_devices() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 1))
        .await;
    fx.router
        .route(discovery(UUID_B, DEFAULT_DEPARTMENT_TOKEN, "Lamp", 3))
        .await;

    fx.router
        .route(status(
            UUID_A,
            &format!("SCANDEVICES:{}:{}", UUID_A, DEFAULT_DEPARTMENT_TOKEN),
        ))
        .await;
    fx.router
        .route(status(UUID_A, &format!("SENDCOMMAND:{}:ON", UUID_B)))
        .await;

    let published = fx.publisher.published();
    assert!(published.contains(&(
        format!("{}/read", UUID_A),
        format!("SCANRESULT:{};Lamp;a test device;3", UUID_B)
    )));
    assert!(published.contains(&(format!("{}/recv", UUID_B), "ON;0:0".to_string())));
}

#[tokio::test]
async fn data_and_unknown_devices() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 1))
        .await;
    fx.router
        .route(InboundMessage::new(format!("{}/WRITE", UUID_A), "raw"))
        .await;
    fx.router.route(status(UUID_B, "STARTUP")).await;
    fx.router
        .route(InboundMessage::new("not-a-device", "STARTUP"))
        .await;

    let resource = fx
        .registry
        .resolve_uuid(UUID_A)
        .await
        .expect("resolve")
        .expect("exists");
    assert_eq!(resource.data_received, b"raw".to_vec());
    assert_eq!(fx.resources.list_resources().await.expect("list").len(), 1);
}

#[tokio::test]
async fn subscribe_all_covers_registered_devices() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 1))
        .await;
    fx.subscriber.topics.lock().expect("lock").clear();

    let count = fx.router.subscribe_all().await.expect("subscribe");
    assert_eq!(count, 4);
    let topics = fx.subscriber.topics.lock().expect("lock").clone();
    assert_eq!(topics[0], "DISCOVERY");
}

#[tokio::test]
async fn scan_for_unregistered_device_is_ignored() {
    const UUID_C: &str = "11111111-2222-4333-8444-555555555555";
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 1))
        .await;
    fx.router
        .route(discovery(UUID_B, DEFAULT_DEPARTMENT_TOKEN, "Lamp", 3))
        .await;
    let before = fx.publisher.published().len();

    fx.router
        .route(status(
            UUID_A,
            &format!("SCANDEVICES:{}:{}", UUID_C, DEFAULT_DEPARTMENT_TOKEN),
        ))
        .await;

    let published = fx.publisher.published();
    assert_eq!(published.len(), before);
    assert!(
        published
            .iter()
            .all(|(topic, _)| topic != &format!("{}/read", UUID_C))
    );
}

#[tokio::test]
async fn repeated_discovery_without_token_is_noop() {
    let fx = fixture(RouterOptions::default());
    fx.router
        .route(discovery(UUID_A, DEFAULT_DEPARTMENT_TOKEN, "Oven", 2))
        .await;
    fx.subscriber.topics.lock().expect("lock").clear();

    fx.router.route(discovery(UUID_A, "", "Renamed", 5)).await;

    let all = fx.resources.list_resources().await.expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Oven");
    assert_eq!(all[0].max_slots, 2);
    assert_eq!(fx.publisher.published().len(), 1);
    assert!(fx.subscriber.topics.lock().expect("lock").is_empty());
}
