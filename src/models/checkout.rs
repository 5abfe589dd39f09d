use chrono::{serde::ts_milliseconds, DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::surplus::SurplusItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckoutStatus {
    /// Gateway order exists; no payment reported yet.
    Created,
    /// Signature verified; claim not yet written.
    Paid,
    Claimed,
    Failed,
    /// Paid, but the item went to someone else.
    Orphaned,
}

impl CheckoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStatus::Created => "Created",
            CheckoutStatus::Paid => "Paid",
            CheckoutStatus::Claimed => "Claimed",
            CheckoutStatus::Failed => "Failed",
            CheckoutStatus::Orphaned => "Orphaned",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub id: String,
    pub item_id: String,
    pub user_id: String,
    pub order_id: String,
    /// Minor currency units, as the gateway expects.
    pub amount: i64,
    pub currency: String,
    pub status: CheckoutStatus,
    pub payment_id: Option<String>,
    pub failure_reason: Option<String>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Checkout {
    pub fn new(item: &SurplusItem, user_id: &str, order_id: String, amount: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            item_id: item.id.clone(),
            user_id: user_id.to_string(),
            order_id,
            amount,
            currency: item.currency.clone(),
            status: CheckoutStatus::Created,
            payment_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sent by the client after the gateway widget reports success.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentSuccessRequest {
    #[validate(custom = "validate_order_id")]
    pub order_id: String,

    #[validate(custom = "validate_payment_id")]
    pub payment_id: String,

    #[validate(custom = "validate_signature")]
    pub signature: String,
}

/// Sent by the client after the gateway widget reports `payment.failed`.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentFailureRequest {
    #[validate(length(max = 100))]
    pub code: Option<String>,

    #[validate(length(min = 1, max = 500, message = "Failure description is required"))]
    pub description: String,

    pub payment_id: Option<String>,
}

/// Options the client hands to the gateway's checkout widget.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_id: String,
    pub key: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub prefill: CheckoutPrefill,
}

#[derive(Debug, Serialize)]
pub struct CheckoutPrefill {
    pub name: String,
    pub email: String,
}

lazy_static! {
    static ref ORDER_ID: Regex = Regex::new(r"^order_[A-Za-z0-9]{6,40}$").unwrap();
    static ref PAYMENT_ID: Regex = Regex::new(r"^pay_[A-Za-z0-9]{6,40}$").unwrap();
    static ref SIGNATURE: Regex = Regex::new(r"^[0-9a-f]{64}$").unwrap();
}

fn validate_order_id(value: &str) -> Result<(), ValidationError> {
    check_format(&ORDER_ID, value, "invalid_order_id", "Malformed order id")
}

fn validate_payment_id(value: &str) -> Result<(), ValidationError> {
    check_format(&PAYMENT_ID, value, "invalid_payment_id", "Malformed payment id")
}

fn validate_signature(value: &str) -> Result<(), ValidationError> {
    check_format(&SIGNATURE, value, "invalid_signature", "Malformed payment signature")
}

fn check_format(
    pattern: &Regex,
    value: &str,
    code: &'static str,
    message: &'static str,
) -> Result<(), ValidationError> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        let mut error = ValidationError::new(code);
        error.message = Some(message.into());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_request_formats() {
        let valid = PaymentSuccessRequest {
            order_id: "order_9A33XWu170gUtm".to_string(),
            payment_id: "pay_29QQoUBi66xm2f".to_string(),
            signature: "a".repeat(64),
        };
        assert!(valid.validate().is_ok());

        let bad = PaymentSuccessRequest {
            order_id: "9A33XWu170gUtm".to_string(),
            payment_id: "pay_29QQoUBi66xm2f".to_string(),
            signature: "not-hex".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("order_id"));
        assert!(fields.contains_key("signature"));
        assert!(!fields.contains_key("payment_id"));
    }

    #[test]
    fn test_status_serializes_as_name() {
        assert_eq!(
            serde_json::to_value(CheckoutStatus::Orphaned).unwrap(),
            serde_json::json!(CheckoutStatus::Orphaned.as_str())
        );
    }
}
