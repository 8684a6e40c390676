use super::notification::{Notification, Notifier};
use super::require_student;
use super::settlement::EnrollmentSettlement;
use crate::domain::ids::AccountId;
use crate::domain::money::Price;
use crate::domain::order::{PaymentStatus, ProviderOrder, WebhookEvent};
use crate::domain::ports::{AccountStoreRef, PaymentProviderRef};
use crate::domain::settlement::SettlementReport;
use crate::error::{EnrollmentError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A client's claim that it completed payment.
///
/// With a `signature` the claim is checked by recomputing the provider's
/// order/payment HMAC; without one the provider is polled and the order must
/// be `paid`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub order_ref: String,
    #[serde(default)]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    pub order_ref: String,
    pub amount: Price,
    pub currency: String,
    #[serde(flatten)]
    pub report: SettlementReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusView {
    pub order_ref: String,
    pub status: PaymentStatus,
    pub paid: bool,
}

/// How a webhook delivery was handled. Both variants are acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAck {
    Settled(SettlementReport),
    Ignored { event_type: String },
}

/// Confirms payments with the provider and hands verified orders to settlement.
///
/// The purchaser and course set always come from the provider-held order
/// metadata, never from the request.
pub struct PaymentVerification {
    provider: PaymentProviderRef,
    settlement: Arc<EnrollmentSettlement>,
    accounts: AccountStoreRef,
    notifier: Notifier,
    timeout: Duration,
}

impl PaymentVerification {
    pub fn new(
        provider: PaymentProviderRef,
        settlement: Arc<EnrollmentSettlement>,
        accounts: AccountStoreRef,
        notifier: Notifier,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            settlement,
            accounts,
            notifier,
            timeout,
        }
    }

    pub fn provider(&self) -> &PaymentProviderRef {
        &self.provider
    }

    pub async fn verify(&self, purchaser: &AccountId, request: &VerifyRequest) -> Result<VerifiedPayment> {
        require_student(&self.accounts, purchaser).await?;
        let order_ref = request.order_ref.trim();
        if order_ref.is_empty() {
            return Err(EnrollmentError::InvalidInput("orderRef is required".to_string()));
        }
        let payment_ref = request.payment_ref.as_deref().unwrap_or_default();

        let order = match &request.signature {
            Some(signature) => {
                if payment_ref.is_empty() {
                    return Err(EnrollmentError::InvalidInput(
                        "paymentRef is required with a signature".to_string(),
                    ));
                }
                if !self
                    .provider
                    .verify_payment_signature(order_ref, payment_ref, signature)
                {
                    warn!(purchaser = %purchaser, order_ref, "Payment signature mismatch");
                    return Err(EnrollmentError::VerificationFailed(
                        "Payment signature mismatch".to_string(),
                    ));
                }
                let order = self.fetch_order(order_ref).await?;
                if matches!(order.status, PaymentStatus::Failed | PaymentStatus::Expired) {
                    return Err(not_complete(&order));
                }
                order
            }
            None => {
                let order = self.fetch_order(order_ref).await?;
                if !order.status.is_paid() {
                    return Err(not_complete(&order));
                }
                order
            }
        };

        if &order.metadata.purchaser != purchaser {
            warn!(purchaser = %purchaser, owner = %order.metadata.purchaser, order_ref, "Order belongs to another purchaser");
            return Err(EnrollmentError::PurchaserMismatch(order_ref.to_string()));
        }

        let report = self.settlement.settle(purchaser, &order.metadata.course_ids).await?;
        info!(
            purchaser = %purchaser,
            order_ref,
            provider = self.provider.name(),
            settled = report.settled.len(),
            failed = report.failed.len(),
            "Payment verified"
        );

        let payment_ref = if payment_ref.is_empty() { order_ref } else { payment_ref };
        self.notify_payment_received(&order, payment_ref, &report).await;

        Ok(VerifiedPayment {
            order_ref: order.order_ref,
            amount: order.amount,
            currency: order.currency,
            report,
        })
    }

    /// Authenticates and processes a provider webhook delivery.
    ///
    /// Redeliveries settle again as no-ops, so the caller can always acknowledge
    /// an `Ok` result.
    pub async fn handle_webhook(&self, payload: &[u8], signature_header: &str) -> Result<WebhookAck> {
        if !self.provider.verify_webhook(payload, signature_header) {
            warn!(provider = self.provider.name(), "Webhook signature rejected");
            return Err(EnrollmentError::VerificationFailed(
                "Invalid webhook signature".to_string(),
            ));
        }

        let order_ref = match self.provider.parse_webhook(payload)? {
            WebhookEvent::PaymentCompleted { order_ref } => order_ref,
            WebhookEvent::Ignored { event_type } => {
                debug!(provider = self.provider.name(), event_type = %event_type, "Webhook event ignored");
                return Ok(WebhookAck::Ignored { event_type });
            }
        };

        let order = self.fetch_order(&order_ref).await?;
        if !order.status.is_paid() {
            return Err(not_complete(&order));
        }

        let purchaser = &order.metadata.purchaser;
        let report = self.settlement.settle(purchaser, &order.metadata.course_ids).await?;
        info!(
            purchaser = %purchaser,
            order_ref = %order_ref,
            provider = self.provider.name(),
            settled = report.settled.len(),
            failed = report.failed.len(),
            "Webhook settled"
        );
        self.notify_payment_received(&order, &order_ref, &report).await;
        Ok(WebhookAck::Settled(report))
    }

    /// Read-only status poll, used while a QR/UPI payment is pending.
    pub async fn order_status(&self, purchaser: &AccountId, order_ref: &str) -> Result<OrderStatusView> {
        require_student(&self.accounts, purchaser).await?;
        let order = self.fetch_order(order_ref).await?;
        if &order.metadata.purchaser != purchaser {
            return Err(EnrollmentError::PurchaserMismatch(order_ref.to_string()));
        }
        Ok(OrderStatusView {
            paid: order.status.is_paid(),
            status: order.status,
            order_ref: order.order_ref,
        })
    }

    async fn fetch_order(&self, order_ref: &str) -> Result<ProviderOrder> {
        match tokio::time::timeout(self.timeout, self.provider.fetch_order(order_ref)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(order_ref, provider = self.provider.name(), timeout = ?self.timeout, "Provider status check timed out");
                Err(EnrollmentError::PaymentNotComplete(format!(
                    "Payment status for order {order_ref} could not be confirmed in time"
                )))
            }
        }
    }

    /// Sends the receipt once, on the run that actually enrolled something.
    async fn notify_payment_received(&self, order: &ProviderOrder, payment_ref: &str, report: &SettlementReport) {
        if report.settled.iter().all(|c| c.already_settled) {
            return;
        }
        let account = match self.accounts.get(&order.metadata.purchaser).await {
            Ok(Some(account)) => account,
            Ok(None) => return,
            Err(e) => {
                warn!(purchaser = %order.metadata.purchaser, error = %e, "Receipt skipped, account lookup failed");
                return;
            }
        };
        self.notifier.enqueue(Notification::PaymentReceived {
            to: account.email.clone(),
            name: account.display_name().to_string(),
            amount: order.amount,
            currency: order.currency.clone(),
            order_ref: order.order_ref.clone(),
            payment_ref: payment_ref.to_string(),
        });
    }
}

fn not_complete(order: &ProviderOrder) -> EnrollmentError {
    EnrollmentError::PaymentNotComplete(format!("Order {} is {}", order.order_ref, order.status))
}
