//! 积分账本仓储
//!
//! 账本只追加不修改；ref_id 唯一约束是所有积分发放的幂等基础

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::LedgerRepositoryTrait;
use crate::error::Result;
use crate::models::{ChangeType, PointsLedger, SourceType};

const LEDGER_COLUMNS: &str =
    "id, user_id, change_type, amount, balance_after, source_type, ref_id, remark, created_at";

pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务操作 ====================

    /// 在事务中追加账本行，返回新行 ID
    #[allow(clippy::too_many_arguments)]
    pub async fn append_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        change_type: ChangeType,
        amount: i64,
        balance_after: i64,
        source_type: SourceType,
        ref_id: Option<&str>,
        remark: Option<&str>,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO points_ledger
                (user_id, change_type, amount, balance_after, source_type, ref_id, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(change_type)
        .bind(amount)
        .bind(balance_after)
        .bind(source_type)
        .bind(ref_id)
        .bind(remark)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    async fn find_by_ref_id(&self, ref_id: &str) -> Result<Option<PointsLedger>> {
        let row = sqlx::query_as::<_, PointsLedger>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM points_ledger WHERE ref_id = $1"
        ))
        .bind(ref_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PointsLedger>> {
        let rows = sqlx::query_as::<_, PointsLedger>(&format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM points_ledger
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM points_ledger WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
