use super::{require_student, unique_course_ids};
use crate::domain::ids::{AccountId, CourseId};
use crate::domain::money::Price;
use crate::domain::order::{LineItem, OrderMetadata, OrderRequest};
use crate::domain::ports::{AccountStoreRef, CourseStoreRef, PaymentProviderRef};
use crate::error::{EnrollmentError, Result};
use serde::Serialize;
use tracing::{info, warn};

/// What the client needs to complete payment for an initiated order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuote {
    pub order_ref: String,
    pub amount: Price,
    pub currency: String,
    pub provider_payload: serde_json::Value,
}

/// Validates a course set and opens a provider order bound to it.
///
/// Reads the catalog only; nothing local is written.
pub struct OrderInitiation {
    courses: CourseStoreRef,
    accounts: AccountStoreRef,
    provider: PaymentProviderRef,
    currency: String,
}

impl OrderInitiation {
    pub fn new(
        courses: CourseStoreRef,
        accounts: AccountStoreRef,
        provider: PaymentProviderRef,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            courses,
            accounts,
            provider,
            currency: currency.into(),
        }
    }

    pub async fn initiate(&self, purchaser: &AccountId, course_ids: &[CourseId]) -> Result<OrderQuote> {
        require_student(&self.accounts, purchaser).await?;
        if course_ids.is_empty() {
            return Err(EnrollmentError::InvalidInput(
                "At least one course id is required".to_string(),
            ));
        }
        if course_ids.iter().any(|id| id.as_str().trim().is_empty()) {
            return Err(EnrollmentError::InvalidInput(
                "Course ids must not be blank".to_string(),
            ));
        }

        let course_ids = unique_course_ids(course_ids);
        let mut line_items = Vec::with_capacity(course_ids.len());
        for course_id in &course_ids {
            // Drafts are invisible to buyers.
            let course = self
                .courses
                .get(course_id)
                .await?
                .filter(|course| course.is_published())
                .ok_or_else(|| EnrollmentError::course_not_found(course_id))?;

            if course.has_student(purchaser) {
                warn!(purchaser = %purchaser, course_id = %course_id, "Purchase rejected, already enrolled");
                return Err(EnrollmentError::AlreadyEnrolled(course_id.to_string()));
            }

            line_items.push(LineItem {
                course_id: course.id,
                name: course.name,
                price: course.price,
            });
        }

        let amount: Price = line_items.iter().map(|item| item.price).sum();
        let request = OrderRequest {
            amount,
            currency: self.currency.clone(),
            metadata: OrderMetadata {
                purchaser: purchaser.clone(),
                course_ids,
            },
            line_items,
        };

        let created = self.provider.create_order(&request).await?;
        info!(
            purchaser = %purchaser,
            order_ref = %created.order_ref,
            provider = self.provider.name(),
            amount = %amount,
            "Order initiated"
        );

        Ok(OrderQuote {
            order_ref: created.order_ref,
            amount,
            currency: request.currency,
            provider_payload: created.provider_payload,
        })
    }
}
