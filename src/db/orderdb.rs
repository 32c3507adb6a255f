// db/orderdb.rs
use async_trait::async_trait;

use super::db::DBClient;

#[async_trait]
pub trait ProcessedOrderExt {
    /// Atomic check-and-set for webhook idempotency. Returns true when this
    /// call won the insert and the caller may process the order; false means
    /// the order id was already recorded (duplicate delivery).
    async fn try_mark_order_processed(&self, order_id: i64) -> Result<bool, sqlx::Error>;

    async fn has_processed_order(&self, order_id: i64) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl ProcessedOrderExt for DBClient {
    async fn try_mark_order_processed(&self, order_id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            r#"
            INSERT INTO processed_orders (order_id)
            VALUES ($1)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn has_processed_order(&self, order_id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as(r#"SELECT order_id FROM processed_orders WHERE order_id = $1"#)
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }
}
