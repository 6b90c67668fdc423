use crate::config::GatewayConfig;
use crate::link::MqttLink;
use crate::router::MessageRouter;
use crate::state::{ConnectionState, ConnectionTracker};
use domain::InboundMessage;
use iot_telemetry::{record_backpressure, record_reconnect};
use rumqttc::{Event, EventLoop, Packet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 传输网关：驱动事件循环、断线重连，并把入站消息交给分发任务。
pub struct TransportGateway {
    config: GatewayConfig,
    router: MessageRouter,
    link: Arc<MqttLink>,
    tracker: ConnectionTracker,
}

impl TransportGateway {
    pub fn new(config: GatewayConfig, router: MessageRouter, link: Arc<MqttLink>) -> Self {
        Self {
            config,
            router,
            link,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// 启动事件循环、分发和存活检查三个任务。
    pub fn start(self, eventloop: EventLoop) -> GatewayHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue_tx, queue_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let wake = Arc::new(Notify::new());

        let poller = spawn_event_loop(
            eventloop,
            self.router.clone(),
            self.tracker.clone(),
            queue_tx,
            wake.clone(),
            Duration::from_millis(self.config.reconnect_delay_ms),
            shutdown_rx.clone(),
        );
        let worker = spawn_worker(self.router.clone(), queue_rx, shutdown_rx.clone());
        let liveness = spawn_liveness(
            self.tracker.clone(),
            wake,
            Duration::from_millis(self.config.liveness_interval_ms.max(1)),
            shutdown_rx,
        );
        info!(
            target: "iot.gateway",
            host = %self.config.host,
            port = self.config.port,
            "gateway_started"
        );
        GatewayHandle {
            shutdown: shutdown_tx,
            tasks: vec![poller, worker, liveness],
            link: self.link,
            tracker: self.tracker,
        }
    }
}

/// 运行中的网关。
pub struct GatewayHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    link: Arc<MqttLink>,
    tracker: ConnectionTracker,
}

impl GatewayHandle {
    pub fn state(&self) -> ConnectionState {
        self.tracker.current()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.tracker.subscribe()
    }

    /// 通知所有任务退出，断开客户端并等待任务结束。
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.link.disconnect().await {
            debug!(target: "iot.gateway", error = %err, "mqtt_disconnect_failed");
        }
        for task in self.tasks {
            let _ = task.await;
        }
        self.tracker.transition(ConnectionState::Disconnected);
        info!(target: "iot.gateway", "gateway_stopped");
    }
}

fn spawn_event_loop(
    mut eventloop: EventLoop,
    router: MessageRouter,
    tracker: ConnectionTracker,
    queue: mpsc::Sender<InboundMessage>,
    wake: Arc<Notify>,
    reconnect_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracker.transition(ConnectionState::Connecting);
        loop {
            if *shutdown.borrow() {
                break;
            }
            let event = tokio::select! {
                _ = shutdown.changed() => break,
                event = eventloop.poll() => event,
            };
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracker.transition(ConnectionState::Connected);
                    info!(target: "iot.gateway", "mqtt_connected");
                    let router = router.clone();
                    tokio::spawn(async move {
                        if let Err(err) = router.subscribe_all().await {
                            warn!(target: "iot.gateway", error = %err, "mqtt_subscribe_failed");
                        }
                    });
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage::new(publish.topic.clone(), publish.payload.to_vec());
                    match queue.try_send(message) {
                        Ok(()) => {}
                        Err(TrySendError::Full(message)) => {
                            record_backpressure();
                            warn!(
                                target: "iot.gateway",
                                topic = %message.topic,
                                "inbound_queue_full"
                            );
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracker.transition(ConnectionState::Disconnected);
                    warn!(
                        target: "iot.gateway",
                        error = %err,
                        delay_ms = reconnect_delay.as_millis() as u64,
                        "mqtt_connection_lost"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(reconnect_delay) => {}
                        _ = wake.notified() => {}
                    }
                    record_reconnect();
                    tracker.transition(ConnectionState::Connecting);
                }
            }
        }
    })
}

fn spawn_worker(
    router: MessageRouter,
    mut queue: mpsc::Receiver<InboundMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                _ = shutdown.changed() => break,
                message = queue.recv() => message,
            };
            match message {
                Some(message) => router.route(message).await,
                None => break,
            }
        }
    })
}

fn spawn_liveness(
    tracker: ConnectionTracker,
    wake: Arc<Notify>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if tracker.current() == ConnectionState::Disconnected {
                        debug!(target: "iot.gateway", "liveness_wake_reconnect");
                        // 只唤醒正在等待的重连，不保留许可
                        wake.notify_waiters();
                    }
                }
            }
        }
    })
}
