//! 邀请关系仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::ReferralRepositoryTrait;
use crate::error::Result;
use crate::models::Referral;

const REFERRAL_COLUMNS: &str = "id, referrer_id, referred_id, status, referrer_points, \
     referred_points, completed_at, created_at";

pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepositoryTrait for ReferralRepository {
    async fn create(&self, referrer_id: i64, referred_id: i64) -> Result<Referral> {
        let referral = sqlx::query_as::<_, Referral>(&format!(
            r#"
            INSERT INTO referrals (referrer_id, referred_id)
            VALUES ($1, $2)
            RETURNING {REFERRAL_COLUMNS}
            "#
        ))
        .bind(referrer_id)
        .bind(referred_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(referral)
    }

    async fn get_by_referred(&self, referred_id: i64) -> Result<Option<Referral>> {
        let referral = sqlx::query_as::<_, Referral>(&format!(
            "SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referred_id = $1"
        ))
        .bind(referred_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(referral)
    }

    async fn list_by_referrer(&self, referrer_id: i64) -> Result<Vec<Referral>> {
        let referrals = sqlx::query_as::<_, Referral>(&format!(
            r#"
            SELECT {REFERRAL_COLUMNS}
            FROM referrals
            WHERE referrer_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(referrals)
    }

    async fn count_completed_by_referrer(&self, referrer_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM referrals WHERE referrer_id = $1 AND status = 'completed'",
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn complete(
        &self,
        id: i64,
        referrer_points: i64,
        referred_points: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        // 守卫条件保证并发下只完成一次
        let result = sqlx::query(
            r#"
            UPDATE referrals
            SET status = 'completed', referrer_points = $2, referred_points = $3, completed_at = $4
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(referrer_points)
        .bind(referred_points)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
