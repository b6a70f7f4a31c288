use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use super::message::NotificationMessage;

#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// Publish-only sink for notification payloads. Failures are reported, never
/// retried here.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError>;
}

/// Writes payloads to the log. Used when no broker is configured.
#[derive(Debug, Default, Clone)]
pub struct LogPublisher {
    topic: String,
}

impl LogPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into() }
    }
}

#[async_trait]
impl NotificationPublisher for LogPublisher {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError> {
        let payload =
            serde_json::to_string(message).map_err(|e| PublishError(e.to_string()))?;
        tracing::info!(
            topic = %self.topic,
            kind = message.kind().as_str(),
            order_id = %message.order_id(),
            payload = %payload,
            "notification published"
        );
        Ok(())
    }
}

/// Keeps every published payload in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPublisher {
    published: Arc<Mutex<Vec<NotificationMessage>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<NotificationMessage> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryPublisher {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError> {
        self.published.lock().await.push(message.clone());
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;

#[cfg(feature = "kafka")]
mod kafka {
    use std::time::Duration;

    use async_trait::async_trait;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;

    use super::{NotificationMessage, NotificationPublisher, PublishError};

    /// Publishes JSON payloads keyed by channel (`email`, `sms`, `push`).
    #[derive(Clone)]
    pub struct KafkaPublisher {
        producer: FutureProducer,
        topic: String,
    }

    impl KafkaPublisher {
        pub fn new(brokers: &str, topic: impl Into<String>) -> Result<Self, rdkafka::error::KafkaError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()?;

            Ok(Self {
                producer,
                topic: topic.into(),
            })
        }
    }

    #[async_trait]
    impl NotificationPublisher for KafkaPublisher {
        async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError> {
            let payload =
                serde_json::to_string(message).map_err(|e| PublishError(e.to_string()))?;
            let key = message.kind().as_str();
            let record = FutureRecord::to(&self.topic).key(key).payload(&payload);

            match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
                Ok(delivery) => {
                    tracing::info!(
                        topic = %self.topic,
                        key,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "notification published"
                    );
                    Ok(())
                }
                Err((e, _msg)) => {
                    tracing::error!(topic = %self.topic, error = %e, "notification publish failed");
                    Err(PublishError(e.to_string()))
                }
            }
        }
    }
}
