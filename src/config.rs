use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub payment: PaymentConfig,
    pub notifications: NotificationConfig,
}

/// Settings for the external payment processor.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub processor_url: String,
    pub timeout: Duration,
    pub terminal_account_number: String,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub image_base_url: String,
    pub sms_sender_phone: String,
    pub topic: String,
    pub kafka_brokers: Option<String>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            processor_url: "http://127.0.0.1:5005".to_string(),
            timeout: Duration::from_secs(30),
            terminal_account_number: "STORE-TERMINAL-0001".to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            image_base_url: "http://127.0.0.1:3000/images".to_string(),
            sms_sender_phone: "+000000000".to_string(),
            topic: "order-notifications".to_string(),
            kafka_brokers: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let payment_defaults = PaymentConfig::default();
        let payment = PaymentConfig {
            processor_url: env::var("PAYMENT_PROCESSOR_URL")
                .unwrap_or(payment_defaults.processor_url),
            timeout: env::var("PAYMENT_PROCESSOR_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(payment_defaults.timeout),
            terminal_account_number: env::var("TERMINAL_ACCOUNT_NUMBER")
                .unwrap_or(payment_defaults.terminal_account_number),
        };

        let notification_defaults = NotificationConfig::default();
        let notifications = NotificationConfig {
            image_base_url: env::var("IMAGE_BASE_URL")
                .unwrap_or(notification_defaults.image_base_url),
            sms_sender_phone: env::var("SMS_SENDER_PHONE")
                .unwrap_or(notification_defaults.sms_sender_phone),
            topic: env::var("NOTIFICATION_TOPIC").unwrap_or(notification_defaults.topic),
            kafka_brokers: env::var("KAFKA_BROKERS").ok(),
        };

        Ok(Self {
            port,
            database_url,
            host,
            payment,
            notifications,
        })
    }
}
