use super::{ensure_success, string_map};
use crate::config::RazorpaySettings;
use crate::domain::money::Price;
use crate::domain::order::{
    CreatedOrder, OrderMetadata, OrderRequest, PaymentStatus, ProviderOrder, WebhookEvent,
};
use crate::domain::ports::PaymentProvider;
use crate::error::{EnrollmentError, Result};
use crate::infrastructure::signing::verify_hmac_sha256_hex;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

const NAME: &str = "razorpay";

/// Razorpay Orders API client.
///
/// Supports the client-side checkout signature, order status polling and
/// `X-Razorpay-Signature` webhooks. When a UPI id is configured the checkout
/// payload also carries a `upi://pay` intent for QR-code payment.
pub struct RazorpayProvider {
    client: Client,
    settings: RazorpaySettings,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
    notes: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    notes: Value,
}

impl RazorpayProvider {
    pub fn new(settings: RazorpaySettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn map_status(status: &str) -> PaymentStatus {
        match status {
            "created" => PaymentStatus::Created,
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }

    fn upi_intent(&self, order_ref: &str, request: &OrderRequest) -> Option<String> {
        let upi_id = self.settings.upi_id.as_deref()?;
        let names = request
            .line_items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let amount = request.amount.to_string();
        let note = format!("Course Payment - {names}");
        Url::parse_with_params(
            "upi://pay",
            &[
                ("pa", upi_id),
                ("pn", self.settings.merchant_name.as_str()),
                ("am", amount.as_str()),
                ("cu", request.currency.as_str()),
                ("tn", note.as_str()),
                ("tr", order_ref),
            ],
        )
        .ok()
        .map(String::from)
    }

    fn into_provider_order(order: RazorpayOrder) -> Result<ProviderOrder> {
        let metadata = OrderMetadata::from_notes(&string_map(&order.notes))?;
        Ok(ProviderOrder {
            status: Self::map_status(&order.status),
            amount: Price::from_minor_units(order.amount)?,
            currency: order.currency,
            order_ref: order.id,
            metadata,
        })
    }
}

#[async_trait]
impl PaymentProvider for RazorpayProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn webhook_signature_header(&self) -> &'static str {
        "x-razorpay-signature"
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder> {
        let mut notes = request.metadata.to_notes()?;
        notes.insert(
            "courseNames".to_string(),
            request
                .line_items
                .iter()
                .map(|item| item.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );
        let body = CreateOrderBody {
            amount: request.amount.to_minor_units()?,
            currency: &request.currency,
            receipt: format!("receipt_{}", chrono::Utc::now().timestamp_millis()),
            notes,
        };

        let response = self
            .client
            .post(self.url("/v1/orders"))
            .basic_auth(&self.settings.key_id, Some(&self.settings.key_secret))
            .json(&body)
            .send()
            .await?;
        let order: RazorpayOrder = ensure_success(NAME, response).await?.json().await?;
        info!(order_ref = %order.id, amount = order.amount, "Razorpay order created");

        let mut payload = serde_json::json!({
            "keyId": self.settings.key_id,
            "orderId": order.id,
            "amountMinor": order.amount,
            "currency": order.currency,
        });
        if let Some(intent) = self.upi_intent(&order.id, request) {
            payload["upiIntent"] = Value::String(intent);
        }

        Ok(CreatedOrder {
            order_ref: order.id,
            provider_payload: payload,
        })
    }

    async fn fetch_order(&self, order_ref: &str) -> Result<ProviderOrder> {
        let response = self
            .client
            .get(self.url(&format!("/v1/orders/{order_ref}")))
            .basic_auth(&self.settings.key_id, Some(&self.settings.key_secret))
            .send()
            .await?;
        let order: RazorpayOrder = ensure_success(NAME, response).await?.json().await?;
        debug!(order_ref, status = %order.status, "Razorpay order fetched");
        Self::into_provider_order(order)
    }

    fn verify_payment_signature(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool {
        verify_hmac_sha256_hex(
            self.settings.key_secret.as_bytes(),
            format!("{order_ref}|{payment_ref}").as_bytes(),
            signature,
        )
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> bool {
        verify_hmac_sha256_hex(
            self.settings.webhook_secret.as_bytes(),
            payload,
            signature_header,
        )
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent> {
        let event: Value = serde_json::from_slice(payload)
            .map_err(|e| EnrollmentError::InvalidInput(format!("Malformed webhook: {e}")))?;
        let event_type = event["event"].as_str().unwrap_or_default().to_string();

        let order_ref = match event_type.as_str() {
            "order.paid" => event.pointer("/payload/order/entity/id"),
            "payment.captured" => event.pointer("/payload/payment/entity/order_id"),
            _ => None,
        }
        .and_then(Value::as_str);

        Ok(match order_ref {
            Some(order_ref) => WebhookEvent::PaymentCompleted {
                order_ref: order_ref.to_string(),
            },
            None => WebhookEvent::Ignored { event_type },
        })
    }
}
