//! 等级仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::RankRepositoryTrait;
use crate::error::Result;
use crate::models::Rank;

const RANK_COLUMNS: &str =
    "id, name, points_required, sort_order, icon_url, perks, created_at, updated_at";

pub struct RankRepository {
    pool: PgPool,
}

impl RankRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RankRepositoryTrait for RankRepository {
    async fn get_rank(&self, id: i64) -> Result<Option<Rank>> {
        let rank =
            sqlx::query_as::<_, Rank>(&format!("SELECT {RANK_COLUMNS} FROM ranks WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(rank)
    }

    async fn list_ranks(&self) -> Result<Vec<Rank>> {
        let ranks = sqlx::query_as::<_, Rank>(&format!(
            "SELECT {RANK_COLUMNS} FROM ranks ORDER BY points_required ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(ranks)
    }
}
