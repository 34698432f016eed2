//! External payment processor.
//!
//! Opening an order is the only remote call; payment verification is a
//! local signature recomputation (see `orivon_canonical::verify_payment`).

use crate::config::PaymentSettings;
use crate::errors::CoreError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use orivon_canonical::{Currency, MinorUnits, OrderRef, PurchaseId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Parameters of a new payment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Amount in minor units.
    pub amount: MinorUnits,
    /// Currency code.
    pub currency: Currency,
    /// Receipt, the local purchase id.
    pub receipt: PurchaseId,
}

/// Opens orders with an external payment processor.
pub trait PaymentProcessor: Send + Sync {
    /// Creates an order and returns the processor's reference for it.
    fn create_order(&self, request: &OrderRequest) -> Result<OrderRef, CoreError>;
}

/// Razorpay Orders API client.
#[derive(Debug)]
pub struct RazorpayClient {
    agent: ureq::Agent,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
}

impl RazorpayClient {
    /// Builds a client; fails when key id or secret is missing.
    pub fn from_settings(settings: &PaymentSettings) -> Result<Self, CoreError> {
        let (Some(key_id), Some(key_secret)) = (&settings.key_id, &settings.key_secret) else {
            return Err(CoreError::Unavailable(
                "payment processor credentials are not configured".into(),
            ));
        };
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(settings.timeout)
            .timeout_read(settings.timeout)
            .timeout_write(settings.timeout)
            .build();
        Ok(Self {
            agent,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            key_id: key_id.clone(),
            key_secret: SecretString::from(key_secret.expose_secret().to_string()),
        })
    }

    fn authorization(&self) -> String {
        let pair = format!("{}:{}", self.key_id, self.key_secret.expose_secret());
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl PaymentProcessor for RazorpayClient {
    fn create_order(&self, request: &OrderRequest) -> Result<OrderRef, CoreError> {
        let body = json!({
            "amount": request.amount.value(),
            "currency": request.currency.as_str(),
            "receipt": request.receipt.as_str(),
            "payment_capture": 1,
        });
        let response = self
            .agent
            .post(&format!("{}/orders", self.api_base))
            .set("Authorization", &self.authorization())
            .send_json(body);
        match response {
            Ok(resp) => {
                let order: OrderResponse = resp.into_json().map_err(|e| {
                    CoreError::Unavailable(format!("unreadable order response: {e}"))
                })?;
                let order_ref = OrderRef::parse(order.id)?;
                info!(order_ref = %order_ref, receipt = %request.receipt, "opened payment order");
                Ok(order_ref)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp.into_string().unwrap_or_default();
                warn!(status = code, "payment processor refused order");
                if code >= 500 {
                    Err(CoreError::Unavailable(format!(
                        "payment processor status {code}"
                    )))
                } else {
                    Err(CoreError::BadRequest(format!(
                        "payment processor rejected order ({code}): {detail}"
                    )))
                }
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(CoreError::Unavailable(transport.to_string()))
            }
        }
    }
}
