use crate::domain::order::{CreatedOrder, OrderRequest, PaymentStatus, ProviderOrder, WebhookEvent};
use crate::domain::ports::PaymentProvider;
use crate::error::{EnrollmentError, Result};
use crate::infrastructure::signing::{hmac_sha256_hex, verify_hmac_sha256_hex};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct SandboxState {
    orders: HashMap<String, ProviderOrder>,
    fetch_delay: Option<Duration>,
    fail_create: bool,
}

/// In-process payment provider for local development and tests.
///
/// Orders live in memory and start as `created`; `mark_paid` / `set_status`
/// simulate the out-of-band payment. Signatures use the same
/// `HMAC_SHA256(secret, "order|payment")` scheme as the Razorpay variant, and
/// webhooks are signed over the raw body.
#[derive(Clone)]
pub struct SandboxProvider {
    secret: Arc<String>,
    state: Arc<RwLock<SandboxState>>,
    sequence: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct SandboxWebhook {
    event: String,
    order_ref: String,
}

impl SandboxProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            state: Arc::new(RwLock::new(SandboxState::default())),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn set_status(&self, order_ref: &str, status: PaymentStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(order_ref)
            .ok_or_else(|| EnrollmentError::Provider(format!("Unknown order {order_ref}")))?;
        order.status = status;
        Ok(())
    }

    pub async fn mark_paid(&self, order_ref: &str) -> Result<()> {
        self.set_status(order_ref, PaymentStatus::Paid).await
    }

    /// Delays every `fetch_order` call, to exercise provider timeouts.
    pub async fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.state.write().await.fetch_delay = delay;
    }

    /// Makes `create_order` fail as if the provider returned a 5xx.
    pub async fn set_fail_create(&self, fail: bool) {
        self.state.write().await.fail_create = fail;
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Signature a client would receive after paying `order_ref` with `payment_ref`.
    pub fn sign_payment(&self, order_ref: &str, payment_ref: &str) -> String {
        hmac_sha256_hex(
            self.secret.as_bytes(),
            format!("{order_ref}|{payment_ref}").as_bytes(),
        )
    }

    /// Body and signature header of a `payment.completed` webhook for `order_ref`.
    pub fn completed_webhook(&self, order_ref: &str) -> (Vec<u8>, String) {
        let body = serde_json::json!({ "event": "payment.completed", "order_ref": order_ref })
            .to_string()
            .into_bytes();
        let signature = hmac_sha256_hex(self.secret.as_bytes(), &body);
        (body, signature)
    }
}

#[async_trait]
impl PaymentProvider for SandboxProvider {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    fn webhook_signature_header(&self) -> &'static str {
        "x-signature"
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder> {
        let amount_minor = request.amount.to_minor_units()?;
        let mut state = self.state.write().await;
        if state.fail_create {
            return Err(EnrollmentError::Provider(
                "sandbox: HTTP 503 Service Unavailable".to_string(),
            ));
        }

        let order_ref = format!("sandbox_order_{}", self.sequence.fetch_add(1, Ordering::SeqCst));
        state.orders.insert(
            order_ref.clone(),
            ProviderOrder {
                order_ref: order_ref.clone(),
                status: PaymentStatus::Created,
                amount: request.amount,
                currency: request.currency.clone(),
                metadata: request.metadata.clone(),
            },
        );
        debug!(order_ref = %order_ref, amount = %request.amount, "Sandbox order created");

        Ok(CreatedOrder {
            provider_payload: serde_json::json!({
                "orderId": order_ref,
                "amountMinor": amount_minor,
                "currency": request.currency,
            }),
            order_ref,
        })
    }

    async fn fetch_order(&self, order_ref: &str) -> Result<ProviderOrder> {
        let delay = self.state.read().await.fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .read()
            .await
            .orders
            .get(order_ref)
            .cloned()
            .ok_or_else(|| EnrollmentError::NotFound {
                entity: "Order",
                id: order_ref.to_string(),
            })
    }

    fn verify_payment_signature(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        verify_hmac_sha256_hex(
            self.secret.as_bytes(),
            format!("{order_ref}|{payment_ref}").as_bytes(),
            signature,
        )
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> bool {
        verify_hmac_sha256_hex(self.secret.as_bytes(), payload, signature_header)
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent> {
        let webhook: SandboxWebhook = serde_json::from_slice(payload)
            .map_err(|e| EnrollmentError::InvalidInput(format!("Malformed webhook: {e}")))?;
        Ok(match webhook.event.as_str() {
            "payment.completed" => WebhookEvent::PaymentCompleted {
                order_ref: webhook.order_ref,
            },
            _ => WebhookEvent::Ignored {
                event_type: webhook.event,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Price;
    use crate::domain::order::OrderMetadata;
    use rust_decimal_macros::dec;

    fn request() -> OrderRequest {
        OrderRequest {
            amount: Price::new(dec!(300)).unwrap(),
            currency: "INR".to_string(),
            metadata: OrderMetadata {
                purchaser: "u1".into(),
                course_ids: vec!["c1".into(), "c2".into()],
            },
            line_items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_order_lifecycle() {
        let provider = SandboxProvider::new("secret");
        let created = provider.create_order(&request()).await.unwrap();
        assert_eq!(created.provider_payload["amountMinor"], 30000);

        let order = provider.fetch_order(&created.order_ref).await.unwrap();
        assert_eq!(order.status, PaymentStatus::Created);
        assert_eq!(order.metadata.course_ids.len(), 2);

        provider.mark_paid(&created.order_ref).await.unwrap();
        let order = provider.fetch_order(&created.order_ref).await.unwrap();
        assert!(order.status.is_paid());
    }

    #[tokio::test]
    async fn test_payment_signature() {
        let provider = SandboxProvider::new("secret");
        let sig = provider.sign_payment("o1", "p1");
        assert!(provider.verify_payment_signature("o1", "p1", &sig));
        assert!(!provider.verify_payment_signature("o1", "p2", &sig));
    }

    #[tokio::test]
    async fn test_webhook_parsing() {
        let provider = SandboxProvider::new("secret");
        let (body, sig) = provider.completed_webhook("o1");
        assert!(provider.verify_webhook(&body, &sig));
        assert_eq!(
            provider.parse_webhook(&body).unwrap(),
            WebhookEvent::PaymentCompleted {
                order_ref: "o1".to_string()
            }
        );

        let other = br#"{"event":"payment.failed","order_ref":"o1"}"#;
        assert!(matches!(
            provider.parse_webhook(other).unwrap(),
            WebhookEvent::Ignored { .. }
        ));
    }
}
