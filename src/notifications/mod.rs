//! Order confirmation notifications.
//!
//! Runs strictly after a settlement has committed. Nothing in here can
//! change the outcome of the payment that triggered it.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::NotificationConfig,
    error::AppError,
    models::{NotificationType, Order},
    repository::NotificationPreferences,
};

pub mod message;
pub mod publisher;

pub use message::NotificationMessage;
pub use publisher::{InMemoryPublisher, LogPublisher, NotificationPublisher, PublishError};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid notification preference {0:?}")]
    InvalidNotificationPreference(Option<String>),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Preference lookup failed: {0}")]
    Lookup(#[from] AppError),
}

#[derive(Clone)]
pub struct NotificationGenerator {
    preferences: Arc<dyn NotificationPreferences>,
    publisher: Arc<dyn NotificationPublisher>,
    config: NotificationConfig,
}

impl NotificationGenerator {
    pub fn new(
        preferences: Arc<dyn NotificationPreferences>,
        publisher: Arc<dyn NotificationPublisher>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            preferences,
            publisher,
            config,
        }
    }

    /// Format the confirmation for the customer's preferred channel and
    /// publish it. Returns the payload that was handed to the publisher.
    pub async fn generate_notification(
        &self,
        customer_id: Uuid,
        order: &Order,
    ) -> Result<NotificationMessage, NotificationError> {
        let stored = self.preferences.notification_type(customer_id).await?;
        let kind = match stored {
            Some(raw) => raw
                .parse::<NotificationType>()
                .map_err(|raw| NotificationError::InvalidNotificationPreference(Some(raw)))?,
            None => return Err(NotificationError::InvalidNotificationPreference(None)),
        };

        let message = match kind {
            NotificationType::Email => message::email(order, &self.config.image_base_url),
            NotificationType::Sms => message::sms(order, &self.config.sms_sender_phone),
            NotificationType::Push => message::push(order),
        };

        self.publisher.publish(&message).await?;
        tracing::info!(
            customer_id = %customer_id,
            order_id = %order.id,
            kind = kind.as_str(),
            "order notification sent"
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryNotificationPreferences;
    use chrono::Utc;

    fn generator() -> (NotificationGenerator, InMemoryNotificationPreferences, InMemoryPublisher) {
        let preferences = InMemoryNotificationPreferences::new();
        let publisher = InMemoryPublisher::new();
        let generator = NotificationGenerator::new(
            Arc::new(preferences.clone()),
            Arc::new(publisher.clone()),
            NotificationConfig::default(),
        );
        (generator, preferences, publisher)
    }

    #[tokio::test]
    async fn dispatches_on_stored_channel() {
        let (generator, preferences, publisher) = generator();
        let customer_id = Uuid::new_v4();
        preferences.set(customer_id, "Push").await;
        let order = Order::open(customer_id, Utc::now());

        let message = generator.generate_notification(customer_id, &order).await.unwrap();

        assert_eq!(message.kind(), NotificationType::Push);
        assert_eq!(publisher.published().await, vec![message]);
    }

    #[tokio::test]
    async fn unknown_channel_is_rejected_without_publishing() {
        let (generator, preferences, publisher) = generator();
        let customer_id = Uuid::new_v4();
        preferences.set(customer_id, "carrier-pigeon").await;
        let order = Order::open(customer_id, Utc::now());

        let err = generator.generate_notification(customer_id, &order).await.unwrap_err();

        assert!(matches!(
            err,
            NotificationError::InvalidNotificationPreference(Some(ref raw)) if raw == "carrier-pigeon"
        ));
        assert!(publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn missing_preference_is_rejected_without_publishing() {
        let (generator, _preferences, publisher) = generator();
        let customer_id = Uuid::new_v4();
        let order = Order::open(customer_id, Utc::now());

        let err = generator.generate_notification(customer_id, &order).await.unwrap_err();

        assert!(matches!(err, NotificationError::InvalidNotificationPreference(None)));
        assert!(publisher.published().await.is_empty());
    }
}
