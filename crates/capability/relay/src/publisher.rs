use crate::error::RelayError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 下行消息发布接口（由传输网关实现）。
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), RelayError>;
}

/// 空发布器（未启用消息代理时使用）。
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl MessagePublisher for NoopPublisher {
    async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), RelayError> {
        Ok(())
    }
}

/// 发布失败时按固定间隔重试。
pub async fn publish_with_retry(
    publisher: Arc<dyn MessagePublisher>,
    topic: &str,
    payload: &[u8],
    max_retries: u64,
    backoff_ms: u64,
) -> Result<(), RelayError> {
    let mut attempt = 0;
    loop {
        match publisher.publish(topic, payload.to_vec()).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                warn!(
                    target: "iot.relay",
                    topic = %topic,
                    attempt = attempt,
                    error = %err,
                    "publish_retry"
                );
                if backoff_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}
