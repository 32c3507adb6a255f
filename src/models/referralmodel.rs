use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "reward_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Claimed,
    Redeemed,
    Expired,
    Cancelled,
}

impl RewardStatus {
    pub fn to_str(&self) -> &str {
        match self {
            RewardStatus::Pending => "pending",
            RewardStatus::Claimed => "claimed",
            RewardStatus::Redeemed => "redeemed",
            RewardStatus::Expired => "expired",
            RewardStatus::Cancelled => "cancelled",
        }
    }
}

/// One row per shareable referral code. `referral_count` is the single
/// source of truth for milestone evaluation and only moves through the
/// ledger's atomic increment.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ReferralAccount {
    pub id: Uuid,
    pub referral_code: String,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub referral_count: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct RewardRedemption {
    pub id: Uuid,
    pub referral_code: String,
    pub customer_email: String,
    pub customer_name: String,
    pub referral_count: i32,
    pub reward_status: RewardStatus,
    pub claim_link: String,
    pub redeemed_order: Option<String>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
