//! Payment gateway variants behind the `PaymentProvider` port.

pub mod razorpay;
pub mod sandbox;
pub mod stripe;

use crate::config::{PaymentSettings, ProviderKind, ServerSettings};
use crate::domain::ports::PaymentProviderRef;
use crate::error::{EnrollmentError, Result};
use reqwest::Response;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

pub use razorpay::RazorpayProvider;
pub use sandbox::SandboxProvider;
pub use stripe::StripeProvider;

/// Builds the provider selected by `payments.provider`.
pub fn build_provider(payments: &PaymentSettings, server: &ServerSettings) -> Result<PaymentProviderRef> {
    let provider: PaymentProviderRef = match payments.provider {
        ProviderKind::Sandbox => Arc::new(SandboxProvider::new(payments.sandbox_secret.clone())),
        ProviderKind::Razorpay => {
            let settings = payments.razorpay.clone().ok_or_else(|| {
                EnrollmentError::Config("payments.razorpay is missing".to_string())
            })?;
            Arc::new(RazorpayProvider::new(settings, payments.timeout())?)
        }
        ProviderKind::Stripe => {
            let settings = payments.stripe.clone().ok_or_else(|| {
                EnrollmentError::Config("payments.stripe is missing".to_string())
            })?;
            Arc::new(StripeProvider::new(
                settings,
                &server.frontend_url,
                payments.timeout(),
            )?)
        }
    };
    info!(provider = provider.name(), "Payment provider configured");
    Ok(provider)
}

/// Turns a non-2xx provider response into `EnrollmentError::Provider`.
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(provider, status = %status, body = %body, "Provider request failed");
    Err(EnrollmentError::Provider(format!(
        "{provider}: HTTP {status} - {}",
        body.chars().take(200).collect::<String>()
    )))
}

/// Flattens a provider metadata object into string pairs.
///
/// Razorpay serialises empty `notes` as `[]`, so anything but an object is empty.
pub(crate) fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k.clone(), s.clone())),
                    Value::Null => None,
                    other => Some((k.clone(), other.to_string())),
                })
                .collect()
        })
        .unwrap_or_default()
}
