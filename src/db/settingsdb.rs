// db/settingsdb.rs
use async_trait::async_trait;
use sqlx::types::Json;

use super::db::DBClient;
use crate::models::settingsmodel::{ReferralSettings, RewardTier};

#[async_trait]
pub trait SettingsExt {
    async fn get_referral_settings(
        &self,
        shop: &str,
    ) -> Result<Option<ReferralSettings>, sqlx::Error>;

    async fn upsert_referral_settings(
        &self,
        shop: &str,
        reward_tiers: &[RewardTier],
        fixed_referee_product: Option<&str>,
    ) -> Result<ReferralSettings, sqlx::Error>;

    async fn delete_referral_settings(&self, shop: &str) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl SettingsExt for DBClient {
    async fn get_referral_settings(
        &self,
        shop: &str,
    ) -> Result<Option<ReferralSettings>, sqlx::Error> {
        sqlx::query_as::<_, ReferralSettings>(
            r#"
            SELECT
                id, shop, reward_tiers, fixed_referee_product,
                created_at, updated_at
            FROM referral_settings
            WHERE shop = $1
            "#,
        )
        .bind(shop)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_referral_settings(
        &self,
        shop: &str,
        reward_tiers: &[RewardTier],
        fixed_referee_product: Option<&str>,
    ) -> Result<ReferralSettings, sqlx::Error> {
        sqlx::query_as::<_, ReferralSettings>(
            r#"
            INSERT INTO referral_settings (shop, reward_tiers, fixed_referee_product)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE
            SET reward_tiers = EXCLUDED.reward_tiers,
                fixed_referee_product = EXCLUDED.fixed_referee_product,
                updated_at = NOW()
            RETURNING
                id, shop, reward_tiers, fixed_referee_product,
                created_at, updated_at
            "#,
        )
        .bind(shop)
        .bind(Json(reward_tiers.to_vec()))
        .bind(fixed_referee_product)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_referral_settings(&self, shop: &str) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(r#"DELETE FROM referral_settings WHERE shop = $1"#)
            .bind(shop)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }
}
