//! 兑换订单仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::OrderRepositoryTrait;
use crate::error::Result;
use crate::models::{Order, OrderStatus};

const ORDER_COLUMNS: &str = "id, order_no, user_id, product_id, points_spent, status, \
     idempotency_key, cancel_reason, created_at, updated_at";

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务操作 ====================

    /// 在事务中创建订单，返回新订单 ID
    pub async fn create_in_tx(
        tx: &mut PgConnection,
        order_no: &str,
        user_id: i64,
        product_id: i64,
        points_spent: i64,
        status: OrderStatus,
        idempotency_key: Option<&str>,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (order_no, user_id, product_id, points_spent, status, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(order_no)
        .bind(user_id)
        .bind(product_id)
        .bind(points_spent)
        .bind(status)
        .bind(idempotency_key)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 在事务中取消订单
    ///
    /// 守卫条件只允许已完成订单取消，返回是否改写成功
    pub async fn cancel_in_tx(tx: &mut PgConnection, order_id: i64, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled', cancel_reason = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'completed'
            "#,
        )
        .bind(order_id)
        .bind(reason)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn get_by_order_no(&self, order_no: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1"
        ))
        .bind(order_no)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_by_user(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn count_completed_by_user(&self, user_id: i64) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status = 'completed'")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}
