use super::ids::{AccountId, CourseId};
use super::money::Price;
use crate::error::{EnrollmentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key holding the purchaser id on the provider-side order.
pub const META_USER_ID: &str = "userId";
/// Metadata key holding the JSON-encoded course id list.
pub const META_COURSES_ID: &str = "coursesId";

/// Purchaser and course set bound to a provider order at creation time.
///
/// Verification reads this back from the provider instead of trusting the
/// client, so a paid order cannot be replayed against a different course set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderMetadata {
    pub purchaser: AccountId,
    pub course_ids: Vec<CourseId>,
}

impl OrderMetadata {
    pub fn to_notes(&self) -> Result<BTreeMap<String, String>> {
        let mut notes = BTreeMap::new();
        notes.insert(META_USER_ID.to_string(), self.purchaser.to_string());
        notes.insert(
            META_COURSES_ID.to_string(),
            serde_json::to_string(&self.course_ids)?,
        );
        Ok(notes)
    }

    pub fn from_notes(notes: &BTreeMap<String, String>) -> Result<Self> {
        let purchaser = notes
            .get(META_USER_ID)
            .ok_or_else(|| EnrollmentError::Provider("Order metadata lacks userId".to_string()))?;
        let courses = notes.get(META_COURSES_ID).ok_or_else(|| {
            EnrollmentError::Provider("Order metadata lacks coursesId".to_string())
        })?;
        let course_ids: Vec<CourseId> = serde_json::from_str(courses).map_err(|e| {
            EnrollmentError::Provider(format!("Order metadata coursesId is malformed: {e}"))
        })?;
        if course_ids.is_empty() {
            return Err(EnrollmentError::Provider(
                "Order metadata carries no courses".to_string(),
            ));
        }
        Ok(Self {
            purchaser: AccountId::new(purchaser.as_str()),
            course_ids,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub course_id: CourseId,
    pub name: String,
    pub price: Price,
}

/// Everything a provider needs to create a payment request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub amount: Price,
    pub currency: String,
    pub metadata: OrderMetadata,
    pub line_items: Vec<LineItem>,
}

/// Provider response to order creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub order_ref: String,
    /// Opaque data the client needs to complete payment (checkout URL, key id, UPI intent).
    pub provider_payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Pending,
    RequiresAction,
    Paid,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::RequiresAction => "requires_action",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Provider-held view of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOrder {
    pub order_ref: String,
    pub status: PaymentStatus,
    pub amount: Price,
    pub currency: String,
    pub metadata: OrderMetadata,
}

/// A webhook delivery after signature verification.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// The order was paid and can be settled.
    PaymentCompleted { order_ref: String },
    /// An event type this service does not act on.
    Ignored { event_type: String },
}
