use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{referralmodel::RewardRedemption, settingsmodel::RewardTier};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct VerifyClaimDto {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRewardDto {
    #[validate(length(min = 1, message = "Referral code is required"))]
    #[serde(rename = "referralCode")]
    pub referral_code: String,

    /// Target status; defaults to "redeemed".
    pub status: Option<String>,

    #[serde(rename = "orderReference")]
    pub order_reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchedRewardDto {
    pub referral_count_required: i32,
    pub product_id: String,
}

impl From<RewardTier> for MatchedRewardDto {
    fn from(tier: RewardTier) -> Self {
        MatchedRewardDto {
            referral_count_required: tier.referral_count,
            product_id: tier.referrer_product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimVerificationDto {
    pub success: bool,
    pub is_valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ClaimVerificationData>,
}

#[derive(Debug, Serialize)]
pub struct ClaimVerificationData {
    pub referral_code: String,
    pub customer_email: String,
    pub customer_name: String,
    pub referral_count: i32,
    pub reward_status: String,
    pub claim_link: String,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub has_reward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_reward: Option<MatchedRewardDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_referee_product: Option<String>,
}

impl ClaimVerificationData {
    pub fn from_redemption(
        redemption: RewardRedemption,
        matched_reward: Option<RewardTier>,
        fixed_referee_product: Option<String>,
    ) -> Self {
        ClaimVerificationData {
            referral_code: redemption.referral_code,
            customer_email: redemption.customer_email,
            customer_name: redemption.customer_name,
            referral_count: redemption.referral_count,
            reward_status: redemption.reward_status.to_str().to_string(),
            claim_link: redemption.claim_link,
            redeemed_at: redemption.redeemed_at,
            created_at: redemption.created_at,
            has_reward: matched_reward.is_some(),
            matched_reward: matched_reward.map(MatchedRewardDto::from),
            fixed_referee_product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RedeemRewardResponseDto {
    pub success: bool,
    pub message: String,
    pub referral_code: String,
    pub old_status: String,
    pub new_status: String,
    pub redeemed_at: Option<DateTime<Utc>>,
}
