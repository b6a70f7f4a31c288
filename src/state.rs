use std::sync::Arc;

use crate::{
    config::{AppConfig, PaymentConfig},
    db::{DbPool, orm_from_pool},
    notifications::{LogPublisher, NotificationGenerator, NotificationPublisher},
    processor::{HttpPaymentProcessor, PaymentProcessor},
    repository::{
        OrderRepository, PgNotificationPreferences, PgOrderRepository, PgProductCatalog,
        ProductCatalog,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub notifier: NotificationGenerator,
    pub payment: PaymentConfig,
}

impl AppState {
    /// Wire the Postgres adapters, the HTTP processor and the configured publisher.
    pub fn from_config(config: &AppConfig, pool: DbPool) -> anyhow::Result<Self> {
        let orm = orm_from_pool(pool.clone());
        let notifier = NotificationGenerator::new(
            Arc::new(PgNotificationPreferences::new(pool.clone())),
            build_publisher(config)?,
            config.notifications.clone(),
        );

        Ok(Self {
            orders: Arc::new(PgOrderRepository::new(orm)),
            catalog: Arc::new(PgProductCatalog::new(pool)),
            processor: Arc::new(HttpPaymentProcessor::new(&config.payment)?),
            notifier,
            payment: config.payment.clone(),
        })
    }
}

#[cfg(feature = "kafka")]
fn build_publisher(config: &AppConfig) -> anyhow::Result<Arc<dyn NotificationPublisher>> {
    use crate::notifications::publisher::KafkaPublisher;

    let topic = config.notifications.topic.clone();
    match config.notifications.kafka_brokers.as_deref() {
        Some(brokers) => Ok(Arc::new(KafkaPublisher::new(brokers, topic)?)),
        None => Ok(Arc::new(LogPublisher::new(topic))),
    }
}

#[cfg(not(feature = "kafka"))]
fn build_publisher(config: &AppConfig) -> anyhow::Result<Arc<dyn NotificationPublisher>> {
    if config.notifications.kafka_brokers.is_some() {
        tracing::warn!("KAFKA_BROKERS is set but the kafka feature is disabled; logging notifications");
    }
    Ok(Arc::new(LogPublisher::new(config.notifications.topic.clone())))
}
