use std::sync::Arc;

use axum::{response::IntoResponse, routing::post, Extension, Json, Router};

use crate::{
    dtos::webhookdtos::{OrderCreatedPayload, WebhookResponse},
    error::HttpError,
    service::attribution::WebhookOutcome,
    AppState,
};

pub fn webhook_handler() -> Router {
    Router::new().route("/order-created", post(order_created))
}

/// Shopify "order created" webhook. Every handled condition answers 200 so
/// the at-least-once sender stops retrying; 5xx is reserved for genuine
/// faults like an unreachable store.
pub async fn order_created(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(payload): Json<OrderCreatedPayload>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::info!("🛒 Order created webhook received: order {}", payload.id);

    let outcome = app_state
        .attribution
        .process(&payload)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(build_response(&payload, outcome)))
}

fn build_response(payload: &OrderCreatedPayload, outcome: WebhookOutcome) -> WebhookResponse {
    let base = WebhookResponse {
        order_id: Some(payload.id),
        order_name: payload.name.clone(),
        ..WebhookResponse::default()
    };

    match outcome {
        WebhookOutcome::AlreadyProcessed => WebhookResponse {
            success: true,
            message: "Order already processed, skipping".to_string(),
            skipped: Some(true),
            ..base
        },
        WebhookOutcome::NotPaid { status } => WebhookResponse {
            success: true,
            message: format!("Order not paid ({}), skipping processing", status),
            skipped: Some(true),
            ..base
        },
        WebhookOutcome::NoSignal => WebhookResponse {
            success: true,
            message: "No referral or claim data found in order".to_string(),
            ..base
        },
        WebhookOutcome::ReferralCodeUnknown { referral_code } => WebhookResponse {
            success: true,
            message: format!(
                "No referral account found for code {}; nothing attributed",
                referral_code
            ),
            referral_code: Some(referral_code),
            ..base
        },
        WebhookOutcome::ReferralAttributed {
            referral_code,
            new_count,
            discount_deleted,
            inviter_tag_added,
            milestone_reached,
        } => WebhookResponse {
            success: true,
            message: format!(
                "Discount code deleted and referral count updated for {}",
                referral_code
            ),
            referral_code: Some(referral_code),
            new_referral_count: Some(new_count),
            discount_deleted: Some(discount_deleted),
            inviter_tag_added: Some(inviter_tag_added),
            milestone_reached,
            ..base
        },
        WebhookOutcome::ClaimDenied { denial } => WebhookResponse {
            success: false,
            message: denial.message(),
            ..base
        },
        WebhookOutcome::ClaimRedeemed { referral_code } => WebhookResponse {
            success: true,
            message: format!("Reward redeemed successfully for {}", referral_code),
            referral_code: Some(referral_code),
            redemption_status: Some("redeemed".to_string()),
            ..base
        },
    }
}
