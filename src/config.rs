//! Service configuration.
//!
//! Loaded from an optional `coursepay.yaml`, an optional explicit file, then
//! `COURSEPAY`-prefixed environment variables (nested keys split on `__`,
//! e.g. `COURSEPAY_PAYMENTS__PROVIDER=stripe`).

use crate::error::{EnrollmentError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name (without extension).
pub const DEFAULT_CONFIG_FILE: &str = "coursepay";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "COURSEPAY";
/// Environment variable holding the tracing filter.
pub const LOG_ENV_VAR: &str = "COURSEPAY_LOG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub payments: PaymentSettings,
    pub mail: MailSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    /// Base URL of the web client, used for checkout redirect links.
    pub frontend_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 4000,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Sandbox,
    Razorpay,
    Stripe,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    pub provider: ProviderKind,
    pub currency: String,
    /// Upper bound on any single provider call.
    pub timeout_secs: u64,
    pub sandbox_secret: String,
    pub razorpay: Option<RazorpaySettings>,
    pub stripe: Option<StripeSettings>,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            currency: "INR".to_string(),
            timeout_secs: 10,
            sandbox_secret: "sandbox_secret".to_string(),
            razorpay: None,
            stripe: None,
        }
    }
}

impl PaymentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpaySettings {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    #[serde(default = "default_razorpay_base_url")]
    pub base_url: String,
    /// UPI virtual payment address; when set, orders carry a `upi://pay` intent.
    #[serde(default)]
    pub upi_id: Option<String>,
    #[serde(default = "default_merchant_name")]
    pub merchant_name: String,
}

fn default_razorpay_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_merchant_name() -> String {
    "StudyX".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_stripe_base_url")]
    pub base_url: String,
}

fn default_stripe_base_url() -> String {
    "https://api.stripe.com".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Writes messages to the log instead of sending them.
    #[default]
    Log,
    /// Posts messages to a transactional-email HTTP API.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub transport: MailTransport,
    pub endpoint: String,
    pub api_key: String,
    pub from_address: String,
    pub from_name: String,
    /// Capacity of the notification outbox channel.
    pub queue_capacity: usize,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            endpoint: String::new(),
            api_key: String::new(),
            from_address: "no-reply@localhost".to_string(),
            from_name: "StudyX".to_string(),
            queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub token_secret: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_secret: "change-me".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration from file and environment.
    ///
    /// Later sources override earlier ones:
    /// 1. `coursepay.yaml` in the current directory (if present)
    /// 2. the file at `path` (required when given)
    /// 3. `COURSEPAY_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        use ::config::{Config, Environment, File, FileFormat};

        let mut builder =
            Config::builder().add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EnrollmentError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the selected provider and mail transport have credentials.
    pub fn validate(&self) -> Result<()> {
        match self.payments.provider {
            ProviderKind::Razorpay if self.payments.razorpay.is_none() => {
                return Err(EnrollmentError::Config(
                    "payments.provider is razorpay but payments.razorpay is missing".to_string(),
                ));
            }
            ProviderKind::Stripe if self.payments.stripe.is_none() => {
                return Err(EnrollmentError::Config(
                    "payments.provider is stripe but payments.stripe is missing".to_string(),
                ));
            }
            _ => {}
        }
        if self.mail.transport == MailTransport::Http && self.mail.endpoint.is_empty() {
            return Err(EnrollmentError::Config(
                "mail.transport is http but mail.endpoint is empty".to_string(),
            ));
        }
        if self.payments.currency.trim().is_empty() {
            return Err(EnrollmentError::Config(
                "payments.currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.payments.provider, ProviderKind::Sandbox);
        assert_eq!(settings.payments.currency, "INR");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_provider_without_credentials_is_rejected() {
        let mut settings = Settings::default();
        settings.payments.provider = ProviderKind::Stripe;
        assert!(matches!(
            settings.validate(),
            Err(EnrollmentError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 9090\npayments:\n  provider: razorpay\n  razorpay:\n    key_id: rzp_test\n    key_secret: s3cret\n    webhook_secret: wh\n"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.payments.provider, ProviderKind::Razorpay);
        let razorpay = settings.payments.razorpay.unwrap();
        assert_eq!(razorpay.key_id, "rzp_test");
        assert_eq!(razorpay.base_url, "https://api.razorpay.com");
        assert_eq!(razorpay.merchant_name, "StudyX");
    }
}
