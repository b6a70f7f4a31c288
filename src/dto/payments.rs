use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Clone, Deserialize, ToSchema)]
pub struct CardPaymentRequest {
    pub holder_name: String,
    pub card_number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvv: String,
}

impl CardPaymentRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.holder_name.trim().is_empty() {
            return Err(AppError::BadRequest("holder_name is required".into()));
        }
        if !is_digits(&self.card_number, 12..=19) {
            return Err(AppError::BadRequest("card_number must be 12-19 digits".into()));
        }
        if !(1..=12).contains(&self.expiry_month) {
            return Err(AppError::BadRequest("expiry_month must be 1-12".into()));
        }
        if self.expiry_year < 2000 {
            return Err(AppError::BadRequest("expiry_year is invalid".into()));
        }
        if !is_digits(&self.cvv, 3..=4) {
            return Err(AppError::BadRequest("cvv must be 3 or 4 digits".into()));
        }
        Ok(())
    }
}

fn is_digits(value: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CardPaymentResult {
    /// `true` when the order was marked Paid, `false` when it was cancelled.
    pub paid: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TerminalPaymentResult {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub sum: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CardPaymentRequest {
        CardPaymentRequest {
            holder_name: "Ada Lovelace".into(),
            card_number: "4111111111111111".into(),
            expiry_month: 12,
            expiry_year: 2030,
            cvv: "123".into(),
        }
    }

    #[test]
    fn accepts_well_formed_card() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_malformed_fields() {
        let cases: [fn(&mut CardPaymentRequest); 6] = [
            |r| r.holder_name = "  ".into(),
            |r| r.card_number = "4111-1111-1111".into(),
            |r| r.card_number = "41111".into(),
            |r| r.expiry_month = 13,
            |r| r.expiry_year = 99,
            |r| r.cvv = "12a".into(),
        ];
        for mutate in cases {
            let mut r = request();
            mutate(&mut r);
            assert!(matches!(r.validate(), Err(AppError::BadRequest(_))));
        }
    }
}
