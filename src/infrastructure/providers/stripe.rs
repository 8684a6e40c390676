use super::{ensure_success, string_map};
use crate::config::StripeSettings;
use crate::domain::money::Price;
use crate::domain::order::{
    CreatedOrder, OrderMetadata, OrderRequest, PaymentStatus, ProviderOrder, WebhookEvent,
};
use crate::domain::ports::PaymentProvider;
use crate::error::{EnrollmentError, Result};
use crate::infrastructure::signing::verify_hmac_sha256_hex;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const NAME: &str = "stripe";
/// Maximum accepted age of a signed webhook.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Stripe hosted Checkout client.
///
/// Payment is confirmed by polling the session's `payment_status`; Stripe
/// issues no client-side order/payment signature, so that strategy always fails.
pub struct StripeProvider {
    client: Client,
    settings: StripeSettings,
    success_url: String,
    cancel_url: String,
}

#[derive(Deserialize)]
struct CheckoutSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    payment_status: String,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: Value,
}

impl StripeProvider {
    pub fn new(settings: StripeSettings, frontend_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let frontend = frontend_url.trim_end_matches('/');
        Ok(Self {
            client,
            settings,
            success_url: format!("{frontend}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{frontend}/payment-cancel"),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn map_status(session: &CheckoutSession) -> PaymentStatus {
        match (session.payment_status.as_str(), session.status.as_deref()) {
            ("paid", _) => PaymentStatus::Paid,
            (_, Some("expired")) => PaymentStatus::Expired,
            (_, Some("open")) => PaymentStatus::Created,
            _ => PaymentStatus::Pending,
        }
    }

    fn form_fields(&self, request: &OrderRequest) -> Result<Vec<(String, String)>> {
        let mut fields = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        let currency = request.currency.to_lowercase();
        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            fields.push((format!("{prefix}[price_data][currency]"), currency.clone()));
            fields.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            fields.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.price.to_minor_units()?.to_string(),
            ));
            fields.push((format!("{prefix}[quantity]"), "1".to_string()));
        }
        for (key, value) in request.metadata.to_notes()? {
            fields.push((format!("metadata[{key}]"), value));
        }
        Ok(fields)
    }

    /// Parses `t=<unix>,v1=<hex>[,v1=<hex>...]`.
    fn parse_signature_header(header: &str) -> Option<(i64, Vec<&str>)> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }
        match (timestamp, signatures.is_empty()) {
            (Some(t), false) => Some((t, signatures)),
            _ => None,
        }
    }

    fn verify_webhook_at(&self, payload: &[u8], signature_header: &str, now: i64) -> bool {
        let Some((timestamp, signatures)) = Self::parse_signature_header(signature_header) else {
            return false;
        };
        if (now - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
            warn!(timestamp, now, "Stripe webhook timestamp outside tolerance");
            return false;
        }
        let mut signed = format!("{timestamp}.").into_bytes();
        signed.extend_from_slice(payload);
        signatures.iter().any(|sig| {
            verify_hmac_sha256_hex(self.settings.webhook_secret.as_bytes(), &signed, sig)
        })
    }

    fn into_provider_order(session: CheckoutSession) -> Result<ProviderOrder> {
        let status = Self::map_status(&session);
        let metadata = OrderMetadata::from_notes(&string_map(&session.metadata))?;
        Ok(ProviderOrder {
            status,
            amount: Price::from_minor_units(session.amount_total.unwrap_or_default())?,
            currency: session.currency.unwrap_or_default().to_uppercase(),
            order_ref: session.id,
            metadata,
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn webhook_signature_header(&self) -> &'static str {
        "stripe-signature"
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder> {
        let response = self
            .client
            .post(self.url("/v1/checkout/sessions"))
            .bearer_auth(&self.settings.secret_key)
            .form(&self.form_fields(request)?)
            .send()
            .await?;
        let session: CheckoutSession = ensure_success(NAME, response).await?.json().await?;
        info!(order_ref = %session.id, "Stripe checkout session created");

        Ok(CreatedOrder {
            provider_payload: serde_json::json!({
                "sessionId": session.id,
                "checkoutUrl": session.url,
            }),
            order_ref: session.id,
        })
    }

    async fn fetch_order(&self, order_ref: &str) -> Result<ProviderOrder> {
        let response = self
            .client
            .get(self.url(&format!("/v1/checkout/sessions/{order_ref}")))
            .bearer_auth(&self.settings.secret_key)
            .send()
            .await?;
        let session: CheckoutSession = ensure_success(NAME, response).await?.json().await?;
        debug!(order_ref, payment_status = %session.payment_status, "Stripe session fetched");
        Self::into_provider_order(session)
    }

    fn verify_payment_signature(&self, order_ref: &str, _payment_ref: &str, _signature: &str) -> bool {
        warn!(order_ref, "Stripe checkout has no payment signature; use status polling");
        false
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> bool {
        self.verify_webhook_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent> {
        let event: Value = serde_json::from_slice(payload)
            .map_err(|e| EnrollmentError::InvalidInput(format!("Malformed webhook: {e}")))?;
        let event_type = event["type"].as_str().unwrap_or_default().to_string();

        let order_ref = match event_type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                event.pointer("/data/object/id").and_then(Value::as_str)
            }
            _ => None,
        };

        Ok(match order_ref {
            Some(order_ref) => WebhookEvent::PaymentCompleted {
                order_ref: order_ref.to_string(),
            },
            None => WebhookEvent::Ignored { event_type },
        })
    }
}
