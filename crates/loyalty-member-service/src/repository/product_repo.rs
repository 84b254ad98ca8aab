//! 商品仓储
//!
//! 库存扣减使用守卫式 UPDATE，超卖由数据库侧兜底

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::ProductRepositoryTrait;
use crate::error::Result;
use crate::models::Product;

const PRODUCT_COLUMNS: &str = "id, name, description, image_url, cost_points, required_rank_id, \
     stock, redeemed_count, status, metadata, created_at, updated_at";

pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务操作 ====================

    /// 在事务中占用一件库存
    ///
    /// 守卫条件挡住售罄商品，返回是否占用成功
    pub async fn reserve_stock_in_tx(tx: &mut PgConnection, product_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET redeemed_count = redeemed_count + 1, updated_at = NOW()
            WHERE id = $1 AND (stock IS NULL OR redeemed_count < stock)
            "#,
        )
        .bind(product_id)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 在事务中释放一件库存（订单取消时回补）
    pub async fn release_stock_in_tx(tx: &mut PgConnection, product_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET redeemed_count = GREATEST(redeemed_count - 1, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProductRepositoryTrait for ProductRepository {
    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list_active(&self, limit: i64, offset: i64) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE status = 'active'
            ORDER BY cost_points ASC, id ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn count_active(&self) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM products WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }
}
