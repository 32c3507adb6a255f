// db/redemptiondb.rs
use async_trait::async_trait;

use super::db::DBClient;
use crate::models::referralmodel::{RewardRedemption, RewardStatus};

#[async_trait]
pub trait RedemptionExt {
    /// Create the redemption for a code, or refresh it when a later
    /// milestone is reached before the earlier one was redeemed. The
    /// refresh overwrites the claim link and the count-at-issue but keeps
    /// the row (and its `pending` status) in place.
    async fn upsert_pending_redemption(
        &self,
        referral_code: &str,
        customer_email: &str,
        customer_name: &str,
        referral_count: i32,
        claim_link: &str,
    ) -> Result<RewardRedemption, sqlx::Error>;

    async fn get_redemption(
        &self,
        referral_code: &str,
    ) -> Result<Option<RewardRedemption>, sqlx::Error>;

    /// The verify-time lookup: only redemptions that have not reached the
    /// terminal `redeemed` state count. Already-redeemed and never-issued
    /// both come back as `None`.
    async fn find_active_redemption(
        &self,
        referral_code: &str,
    ) -> Result<Option<RewardRedemption>, sqlx::Error>;

    /// Transition to `redeemed`, stamping `redeemed_at` and the triggering
    /// order. No-op when the redemption is already redeemed.
    async fn mark_redemption_redeemed(
        &self,
        referral_code: &str,
        order_reference: &str,
    ) -> Result<Option<RewardRedemption>, sqlx::Error>;

    async fn update_redemption_status(
        &self,
        referral_code: &str,
        status: RewardStatus,
    ) -> Result<Option<RewardRedemption>, sqlx::Error>;
}

#[async_trait]
impl RedemptionExt for DBClient {
    async fn upsert_pending_redemption(
        &self,
        referral_code: &str,
        customer_email: &str,
        customer_name: &str,
        referral_count: i32,
        claim_link: &str,
    ) -> Result<RewardRedemption, sqlx::Error> {
        sqlx::query_as::<_, RewardRedemption>(
            r#"
            INSERT INTO reward_redemptions
                (referral_code, customer_email, customer_name, referral_count, reward_status, claim_link)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            ON CONFLICT (referral_code) DO UPDATE
            SET customer_email = EXCLUDED.customer_email,
                customer_name = EXCLUDED.customer_name,
                referral_count = EXCLUDED.referral_count,
                reward_status = 'pending',
                claim_link = EXCLUDED.claim_link,
                updated_at = NOW()
            RETURNING
                id, referral_code, customer_email, customer_name, referral_count,
                reward_status, claim_link, redeemed_order, redeemed_at,
                created_at, updated_at
            "#,
        )
        .bind(referral_code)
        .bind(customer_email)
        .bind(customer_name)
        .bind(referral_count)
        .bind(claim_link)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_redemption(
        &self,
        referral_code: &str,
    ) -> Result<Option<RewardRedemption>, sqlx::Error> {
        sqlx::query_as::<_, RewardRedemption>(
            r#"
            SELECT
                id, referral_code, customer_email, customer_name, referral_count,
                reward_status, claim_link, redeemed_order, redeemed_at,
                created_at, updated_at
            FROM reward_redemptions
            WHERE referral_code = $1
            "#,
        )
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_active_redemption(
        &self,
        referral_code: &str,
    ) -> Result<Option<RewardRedemption>, sqlx::Error> {
        sqlx::query_as::<_, RewardRedemption>(
            r#"
            SELECT
                id, referral_code, customer_email, customer_name, referral_count,
                reward_status, claim_link, redeemed_order, redeemed_at,
                created_at, updated_at
            FROM reward_redemptions
            WHERE referral_code = $1
              AND reward_status != 'redeemed'
            "#,
        )
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_redemption_redeemed(
        &self,
        referral_code: &str,
        order_reference: &str,
    ) -> Result<Option<RewardRedemption>, sqlx::Error> {
        sqlx::query_as::<_, RewardRedemption>(
            r#"
            UPDATE reward_redemptions
            SET reward_status = 'redeemed',
                redeemed_order = $2,
                redeemed_at = NOW(),
                updated_at = NOW()
            WHERE referral_code = $1
              AND reward_status != 'redeemed'
            RETURNING
                id, referral_code, customer_email, customer_name, referral_count,
                reward_status, claim_link, redeemed_order, redeemed_at,
                created_at, updated_at
            "#,
        )
        .bind(referral_code)
        .bind(order_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_redemption_status(
        &self,
        referral_code: &str,
        status: RewardStatus,
    ) -> Result<Option<RewardRedemption>, sqlx::Error> {
        sqlx::query_as::<_, RewardRedemption>(
            r#"
            UPDATE reward_redemptions
            SET reward_status = $2,
                updated_at = NOW()
            WHERE referral_code = $1
            RETURNING
                id, referral_code, customer_email, customer_name, referral_count,
                reward_status, claim_link, redeemed_order, redeemed_at,
                created_at, updated_at
            "#,
        )
        .bind(referral_code)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }
}
