//! 用户仓储
//!
//! 提供用户账号的数据访问，支持事务和行级锁

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::{NewUser, UserRepositoryTrait};
use crate::error::Result;
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, password_hash, points_balance, lifetime_points, \
     rank_id, referral_code, referred_by, status, created_at, updated_at";

/// 用户仓储
///
/// 负责用户账号的 CRUD 操作，支持事务场景下的行级锁定
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取用户（带行级锁）
    ///
    /// 使用 FOR UPDATE 锁定行，防止余额变动的并发问题
    pub async fn get_user_for_update(tx: &mut PgConnection, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(user)
    }

    /// 在事务中写入余额和累计积分
    ///
    /// 覆盖写入，调用方必须先持有该行的 FOR UPDATE 锁
    pub async fn apply_balance_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        points_balance: i64,
        lifetime_points: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET points_balance = $2, lifetime_points = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(points_balance)
        .bind(lifetime_points)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, referral_code, referred_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.referral_code)
        .bind(user.referred_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn set_rank(&self, user_id: i64, rank_id: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE users SET rank_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(rank_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
