// db/referraldb.rs
use async_trait::async_trait;

use super::db::DBClient;
use crate::models::referralmodel::ReferralAccount;

#[async_trait]
pub trait ReferralExt {
    async fn save_referral_account(
        &self,
        referral_code: &str,
        customer_id: &str,
        customer_email: Option<&str>,
        customer_name: Option<&str>,
    ) -> Result<ReferralAccount, sqlx::Error>;

    async fn get_referral_account(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralAccount>, sqlx::Error>;

    async fn get_referral_accounts(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ReferralAccount>, sqlx::Error>;

    /// Atomic increment-and-read for the referral ledger. Runs as a single
    /// UPDATE so concurrent attributions for the same code cannot lose
    /// updates. Returns `None` when the code is unknown.
    async fn increment_referral_count(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralAccount>, sqlx::Error>;
}

#[async_trait]
impl ReferralExt for DBClient {
    async fn save_referral_account(
        &self,
        referral_code: &str,
        customer_id: &str,
        customer_email: Option<&str>,
        customer_name: Option<&str>,
    ) -> Result<ReferralAccount, sqlx::Error> {
        sqlx::query_as::<_, ReferralAccount>(
            r#"
            INSERT INTO referral_accounts (referral_code, customer_id, customer_email, customer_name)
            VALUES ($1, $2, $3, $4)
            RETURNING
                id, referral_code, customer_id, customer_email, customer_name,
                referral_count, created_at, updated_at
            "#,
        )
        .bind(referral_code)
        .bind(customer_id)
        .bind(customer_email)
        .bind(customer_name)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_referral_account(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralAccount>, sqlx::Error> {
        sqlx::query_as::<_, ReferralAccount>(
            r#"
            SELECT
                id, referral_code, customer_id, customer_email, customer_name,
                referral_count, created_at, updated_at
            FROM referral_accounts
            WHERE referral_code = $1
            "#,
        )
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_referral_accounts(
        &self,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ReferralAccount>, sqlx::Error> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        sqlx::query_as::<_, ReferralAccount>(
            r#"
            SELECT
                id, referral_code, customer_id, customer_email, customer_name,
                referral_count, created_at, updated_at
            FROM referral_accounts
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn increment_referral_count(
        &self,
        referral_code: &str,
    ) -> Result<Option<ReferralAccount>, sqlx::Error> {
        sqlx::query_as::<_, ReferralAccount>(
            r#"
            UPDATE referral_accounts
            SET referral_count = referral_count + 1,
                updated_at = NOW()
            WHERE referral_code = $1
            RETURNING
                id, referral_code, customer_id, customer_email, customer_name,
                referral_count, created_at, updated_at
            "#,
        )
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }
}
