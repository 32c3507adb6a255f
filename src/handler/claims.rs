use std::sync::Arc;

use axum::{response::IntoResponse, routing::post, Extension, Json, Router};
use validator::Validate;

use crate::{
    db::RedemptionExt,
    dtos::claimdtos::{
        ClaimVerificationData, ClaimVerificationDto, RedeemRewardDto, RedeemRewardResponseDto,
        VerifyClaimDto,
    },
    error::{ErrorMessage, HttpError},
    models::referralmodel::RewardStatus,
    service::attribution::ClaimCheck,
    AppState,
};

pub fn claims_handler() -> Router {
    Router::new()
        .route("/verify", post(verify_claim))
        .route("/redeem", post(redeem_reward))
}

/// Storefront-facing token check; powers the checkout banner.
pub async fn verify_claim(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<VerifyClaimDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    tracing::info!(
        "🔍 Verifying claim token ({}...)",
        &body.token.chars().take(16).collect::<String>()
    );

    let check = app_state
        .attribution
        .verify_claim(&body.token)
        .await
        .map_err(HttpError::from)?;

    let response = match check {
        ClaimCheck::Valid(verification) => ClaimVerificationDto {
            success: true,
            is_valid: true,
            message: "Claim reward verified successfully".to_string(),
            data: Some(ClaimVerificationData::from_redemption(
                verification.redemption,
                verification.matched_tier,
                verification.fixed_referee_product,
            )),
        },
        ClaimCheck::Denied(denial) => ClaimVerificationDto {
            success: false,
            is_valid: false,
            message: denial.message(),
            data: None,
        },
    };

    Ok(Json(response))
}

/// Transitions a redemption's status; defaults to `redeemed`.
pub async fn redeem_reward(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RedeemRewardDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let status = match body.status.as_deref().unwrap_or("redeemed") {
        "pending" => RewardStatus::Pending,
        "claimed" => RewardStatus::Claimed,
        "redeemed" => RewardStatus::Redeemed,
        "expired" => RewardStatus::Expired,
        "cancelled" => RewardStatus::Cancelled,
        other => {
            return Err(HttpError::bad_request(format!(
                "Unknown reward status: {}",
                other
            )))
        }
    };

    let existing = app_state
        .db_client
        .get_redemption(&body.referral_code)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::RedemptionNotFound.to_str()))?;

    if status == RewardStatus::Redeemed && existing.reward_status == RewardStatus::Redeemed {
        return Err(HttpError::bad_request(
            ErrorMessage::RewardAlreadyRedeemed.to_str(),
        ));
    }

    let updated = if status == RewardStatus::Redeemed {
        let order_reference = body.order_reference.as_deref().unwrap_or("manual");
        app_state
            .db_client
            .mark_redemption_redeemed(&body.referral_code, order_reference)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
    } else {
        app_state
            .db_client
            .update_redemption_status(&body.referral_code, status)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
    }
    .ok_or_else(|| HttpError::not_found(ErrorMessage::RedemptionNotFound.to_str()))?;

    tracing::info!(
        "✅ Reward status updated for {}: {} → {}",
        updated.referral_code,
        existing.reward_status.to_str(),
        updated.reward_status.to_str()
    );

    Ok(Json(RedeemRewardResponseDto {
        success: true,
        message: format!("Reward status updated to: {}", updated.reward_status.to_str()),
        referral_code: updated.referral_code,
        old_status: existing.reward_status.to_str().to_string(),
        new_status: updated.reward_status.to_str().to_string(),
        redeemed_at: updated.redeemed_at,
    }))
}
