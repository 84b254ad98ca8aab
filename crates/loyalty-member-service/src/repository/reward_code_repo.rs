//! 兑换码仓储
//!
//! 全局余量扣减使用守卫式 UPDATE，防止超发

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::RewardCodeRepositoryTrait;
use crate::error::Result;
use crate::models::RewardCode;

const CODE_COLUMNS: &str = "id, code, points_value, max_claims, claim_count, per_user_limit, \
     starts_at, expires_at, status, created_at, updated_at";

pub struct RewardCodeRepository {
    pool: PgPool,
}

impl RewardCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务操作 ====================

    /// 在事务中占用一次全局领取额度
    ///
    /// 返回是否占用成功，失败表示已被领完
    pub async fn reserve_claim_in_tx(tx: &mut PgConnection, code_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reward_codes
            SET claim_count = claim_count + 1, updated_at = NOW()
            WHERE id = $1 AND (max_claims IS NULL OR claim_count < max_claims)
            "#,
        )
        .bind(code_id)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 在事务中记录领取流水，返回新记录 ID
    pub async fn insert_claim_in_tx(
        tx: &mut PgConnection,
        code_id: i64,
        user_id: i64,
        claim_seq: i32,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO reward_code_claims (code_id, user_id, claim_seq)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(code_id)
        .bind(user_id)
        .bind(claim_seq)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }
}

#[async_trait]
impl RewardCodeRepositoryTrait for RewardCodeRepository {
    async fn get_by_code(&self, code: &str) -> Result<Option<RewardCode>> {
        let reward_code = sqlx::query_as::<_, RewardCode>(&format!(
            "SELECT {CODE_COLUMNS} FROM reward_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward_code)
    }

    async fn count_user_claims(&self, code_id: i64, user_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reward_code_claims WHERE code_id = $1 AND user_id = $2",
        )
        .bind(code_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
