//! External payment processor used by card and terminal settlement.

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::PaymentConfig;

/// Processor-facing card transaction, built fresh per settlement call.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransaction {
    pub holder_name: String,
    pub card_number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvv: String,
    pub amount: Decimal,
}

impl fmt::Debug for CardTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = self
            .card_number
            .get(self.card_number.len().saturating_sub(4)..)
            .unwrap_or_default();
        f.debug_struct("CardTransaction")
            .field("holder_name", &self.holder_name)
            .field("card_number", &format_args!("****{tail}"))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalTransaction {
    pub amount: Decimal,
    pub account_number: String,
    pub invoice_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorOutcome {
    Approved,
    Declined,
}

impl ProcessorOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, ProcessorOutcome::Approved)
    }
}

/// Declines, transport failures and timeouts all come back as
/// [`ProcessorOutcome::Declined`]; none of them are errors to the caller.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn card_transaction(&self, transaction: &CardTransaction) -> ProcessorOutcome;

    async fn terminal_transaction(&self, transaction: &TerminalTransaction) -> ProcessorOutcome;
}

pub struct HttpPaymentProcessor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentProcessor {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.processor_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> ProcessorOutcome {
        let url = format!("{}{}", self.base_url, path);
        match self.client.post(&url).json(body).send().await {
            Ok(response) if response.status().is_success() => ProcessorOutcome::Approved,
            Ok(response) => {
                tracing::warn!(url = %url, status = %response.status(), "payment declined by processor");
                ProcessorOutcome::Declined
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, timeout = err.is_timeout(), "payment processor unreachable");
                ProcessorOutcome::Declined
            }
        }
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn card_transaction(&self, transaction: &CardTransaction) -> ProcessorOutcome {
        self.post("/api/transactions/card", transaction).await
    }

    async fn terminal_transaction(&self, transaction: &TerminalTransaction) -> ProcessorOutcome {
        self.post("/api/transactions/terminal", transaction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[test]
    fn debug_output_masks_card_number() {
        let tx = CardTransaction {
            holder_name: "Ada Lovelace".into(),
            card_number: "4111111111111111".into(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".into(),
            amount: dec!(10.00),
        };
        let rendered = format!("{tx:?}");
        assert!(rendered.contains("****1111"));
        assert!(!rendered.contains("4111111111111111"));
        assert!(!rendered.contains("cvv"));
    }

    #[test]
    fn terminal_transaction_serializes_camel_case() {
        let tx = TerminalTransaction {
            amount: dec!(5.50),
            account_number: "ACC".into(),
            invoice_number: "TRM-1".into(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["accountNumber"], "ACC");
        assert_eq!(json["invoiceNumber"], "TRM-1");
    }

    #[tokio::test]
    async fn unreachable_processor_is_a_decline() {
        let processor = HttpPaymentProcessor::new(&PaymentConfig {
            processor_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_millis(500),
            terminal_account_number: "ACC".into(),
        })
        .unwrap();
        let tx = TerminalTransaction {
            amount: dec!(1.00),
            account_number: "ACC".into(),
            invoice_number: "TRM-1".into(),
        };
        assert_eq!(
            processor.terminal_transaction(&tx).await,
            ProcessorOutcome::Declined
        );
    }
}
