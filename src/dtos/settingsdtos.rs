use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::settingsmodel::RewardTier;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RewardTierDto {
    #[validate(range(min = 1, message = "Referral count must be at least 1"))]
    #[serde(rename = "referralCount")]
    pub referral_count: i32,

    #[validate(length(min = 1, message = "Referrer product is required"))]
    #[serde(rename = "referrerProduct")]
    pub referrer_product: String,
}

impl From<RewardTierDto> for RewardTier {
    fn from(dto: RewardTierDto) -> Self {
        RewardTier {
            referral_count: dto.referral_count,
            referrer_product: dto.referrer_product,
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SaveRewardSettingsDto {
    #[validate]
    #[serde(rename = "rewardTiers")]
    pub reward_tiers: Vec<RewardTierDto>,

    #[serde(rename = "fixedRefereeProduct")]
    pub fixed_referee_product: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RewardSettingsResponseDto {
    pub success: bool,
    #[serde(rename = "rewardTiers")]
    pub reward_tiers: Vec<RewardTier>,
    #[serde(rename = "fixedRefereeProduct")]
    pub fixed_referee_product: Option<String>,
}
