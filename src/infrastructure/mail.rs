//! Mail transports behind the `MailSender` port.

use crate::config::{MailSettings, MailTransport};
use crate::domain::ports::{MailSender, MailSenderRef};
use crate::error::{EnrollmentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts messages as JSON to a transactional-email HTTP API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(settings: &MailSettings) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_MAIL_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            from: format!("{} <{}>", settings.from_name, settings.from_address),
        })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&OutgoingMail {
            from: &self.from,
            to,
            subject,
            html: html_body,
        });
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EnrollmentError::Notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Mail endpoint rejected message");
            return Err(EnrollmentError::Notification(format!(
                "HTTP {status} - {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        debug!(to, subject, "Mail delivered");
        Ok(())
    }
}

/// Writes messages to the log; the default for development.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!(to, subject, bytes = html_body.len(), "Mail (log transport)");
        Ok(())
    }
}

pub fn build_mailer(settings: &MailSettings) -> Result<MailSenderRef> {
    Ok(match settings.transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Http => Arc::new(HttpMailer::new(settings)?),
    })
}
