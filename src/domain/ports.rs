use super::account::Account;
use super::course::Course;
use super::ids::{AccountId, CourseId, ProgressId};
use super::order::{CreatedOrder, OrderRequest, ProviderOrder, WebhookEvent};
use super::progress::{ProgressRecord, ProgressUpsert};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of an add-if-absent update on a set-like field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetUpdate {
    Added,
    AlreadyPresent,
}

impl SetUpdate {
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            Self::Added
        } else {
            Self::AlreadyPresent
        }
    }
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn put(&self, course: Course) -> Result<()>;
    async fn get(&self, id: &CourseId) -> Result<Option<Course>>;
    /// Atomically adds `account` to the course's enrolled set.
    ///
    /// Returns `None` when the course does not exist.
    async fn add_student(&self, id: &CourseId, account: &AccountId) -> Result<Option<SetUpdate>>;
    async fn remove(&self, id: &CourseId) -> Result<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn put(&self, account: Account) -> Result<()>;
    async fn get(&self, id: &AccountId) -> Result<Option<Account>>;
    /// Atomically adds the course and its progress record to the account, keyed on course id.
    ///
    /// Returns `None` when the account does not exist.
    async fn add_enrollment(
        &self,
        id: &AccountId,
        course: &CourseId,
        progress: &ProgressId,
    ) -> Result<Option<SetUpdate>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Returns the record for the pair, creating an empty one if none exists.
    async fn create_or_get(&self, account: &AccountId, course: &CourseId) -> Result<ProgressUpsert>;
    async fn find(&self, account: &AccountId, course: &CourseId) -> Result<Option<ProgressRecord>>;
    async fn list_for_account(&self, account: &AccountId) -> Result<Vec<ProgressRecord>>;
}

/// Capability set shared by every payment gateway variant.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;
    /// HTTP header carrying this provider's webhook signature.
    fn webhook_signature_header(&self) -> &'static str;
    async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder>;
    async fn fetch_order(&self, order_ref: &str) -> Result<ProviderOrder>;
    /// Recomputes the client-side payment signature and compares in constant time.
    fn verify_payment_signature(&self, order_ref: &str, payment_ref: &str, signature: &str) -> bool;
    /// Authenticates a raw webhook body against its signature header.
    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> bool;
    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent>;
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

pub type CourseStoreRef = Arc<dyn CourseStore>;
pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type ProgressStoreRef = Arc<dyn ProgressStore>;
pub type PaymentProviderRef = Arc<dyn PaymentProvider>;
pub type MailSenderRef = Arc<dyn MailSender>;
