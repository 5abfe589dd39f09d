use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: i64,
}

#[derive(Clone)]
pub struct RazorpayService {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayService {
    pub fn new(config: RazorpayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    pub fn merchant_name(&self) -> &str {
        &self.config.merchant_name
    }

    /// Create an order the checkout widget will pay against
    pub async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder> {
        let payload = json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
            "payment_capture": 1,
        });

        log::info!("Creating gateway order for receipt {} ({} {})", receipt, amount, currency);

        let response = self
            .client
            .post(format!("{}/v1/orders", self.config.api_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Order creation failed: {}", error_text));
        }

        let body: Value = response.json().await?;
        let order = parse_order(&body)?;

        log::info!("Created gateway order {}", order.order_id);
        Ok(order)
    }

    /// Validate the signature the checkout widget returns on success:
    /// `hex(HMAC_SHA256(key_secret, order_id + "|" + payment_id))`.
    pub fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let mut mac = match HmacSha256::new_from_slice(self.config.key_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };

        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());

        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        // verify_slice compares in constant time
        mac.verify_slice(&provided).is_ok()
    }
}

fn parse_order(body: &Value) -> Result<GatewayOrder> {
    let order_id = body["id"]
        .as_str()
        .ok_or_else(|| anyhow!("No id in order response"))?;
    let amount = body["amount"]
        .as_i64()
        .ok_or_else(|| anyhow!("No amount in order response"))?;

    Ok(GatewayOrder {
        order_id: order_id.to_string(),
        amount,
    })
}

#[cfg(test)]
pub(crate) fn test_config() -> RazorpayConfig {
    RazorpayConfig {
        api_url: "https://gateway.invalid".to_string(),
        key_id: "rzp_test_key".to_string(),
        key_secret: "test_key_secret".to_string(),
        currency: "INR".to_string(),
        merchant_name: "SwapLink".to_string(),
        timeout_secs: 5,
    }
}

/// Produces the signature the gateway would send for a successful payment.
#[cfg(test)]
pub(crate) fn sign(order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(test_config().key_secret.as_bytes()).unwrap();
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_signature_validation() {
        let service = RazorpayService::new(test_config());
        let signature = sign("order_ABC123xyz", "pay_XYZ987abc");

        assert!(service.verify_payment_signature("order_ABC123xyz", "pay_XYZ987abc", &signature));
        assert!(!service.verify_payment_signature("order_ABC123xyz", "pay_other0000", &signature));
        assert!(!service.verify_payment_signature("order_ABC123xyz", "pay_XYZ987abc", "invalid_signature"));
        assert!(!service.verify_payment_signature("order_ABC123xyz", "pay_XYZ987abc", &"0".repeat(64)));
    }

    #[test]
    fn test_order_parsing() {
        let body = json!({
            "id": "order_9A33XWu170gUtm",
            "entity": "order",
            "amount": 4950,
            "currency": "INR",
            "status": "created"
        });
        let order = parse_order(&body).unwrap();
        assert_eq!(order.order_id, "order_9A33XWu170gUtm");
        assert_eq!(order.amount, 4950);

        assert!(parse_order(&json!({ "error": { "code": "BAD_REQUEST_ERROR" } })).is_err());
    }
}
