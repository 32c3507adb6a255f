use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// A configured milestone: reaching `referral_count` referrals unlocks
/// `referrer_product` for the referring customer.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RewardTier {
    pub referral_count: i32,
    pub referrer_product: String,
}

/// Per-shop reward configuration. `reward_tiers` is the one canonical
/// shape; rows that fail to decode are rejected, not probed for
/// alternative layouts.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ReferralSettings {
    pub id: Uuid,
    pub shop: String,
    pub reward_tiers: Json<Vec<RewardTier>>,
    pub fixed_referee_product: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
