use super::AppState;
use super::auth::Purchaser;
use crate::application::checkout::OrderQuote;
use crate::application::verification::{OrderStatusView, VerifiedPayment, VerifyRequest, WebhookAck};
use crate::domain::ids::CourseId;
use crate::error::{EnrollmentError, Result};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Success envelope shared by every JSON response.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateOrderBody {
    pub course_ids: Vec<CourseId>,
}

pub async fn initiate_order_handler(
    State(state): State<AppState>,
    Purchaser(purchaser): Purchaser,
    Json(body): Json<InitiateOrderBody>,
) -> Result<Json<Envelope<OrderQuote>>> {
    let quote = state.checkout.initiate(&purchaser, &body.course_ids).await?;
    Ok(Envelope::ok(quote))
}

/// Settles a paid order. A partially settled order is still `200` but reports
/// `success: false` and lists the failed courses.
pub async fn verify_payment_handler(
    State(state): State<AppState>,
    Purchaser(purchaser): Purchaser,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<Envelope<VerifiedPayment>>> {
    let verified = state.verification.verify(&purchaser, &body).await?;
    let complete = verified.report.is_complete();
    Ok(Json(Envelope {
        success: complete,
        message: (!complete).then(|| "Payment verified but some courses could not be enrolled".to_string()),
        data: verified,
    }))
}

pub async fn order_status_handler(
    State(state): State<AppState>,
    Purchaser(purchaser): Purchaser,
    Path(order_ref): Path<String>,
) -> Result<Json<Envelope<OrderStatusView>>> {
    let view = state.verification.order_status(&purchaser, &order_ref).await?;
    Ok(Envelope::ok(view))
}

/// Provider-initiated; authenticated by the body signature, not a session.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let header_name = state.verification.provider().webhook_signature_header();
    let signature = headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            EnrollmentError::VerificationFailed(format!("Missing {header_name} header"))
        })?;

    let ack = state.verification.handle_webhook(&body, signature).await?;
    Ok(Json(match ack {
        WebhookAck::Settled(report) => json!({ "received": true, "settled": report.settled, "failed": report.failed }),
        WebhookAck::Ignored { event_type } => json!({ "received": true, "ignored": event_type }),
    }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "success": true, "message": "Your server is up and running" }))
}
