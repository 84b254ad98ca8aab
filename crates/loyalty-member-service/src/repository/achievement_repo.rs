//! 成就仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::AchievementRepositoryTrait;
use crate::error::Result;
use crate::models::{Achievement, AchievementTrigger, UserAchievement};

const ACHIEVEMENT_COLUMNS: &str = "id, code, name, description, icon_url, points_reward, \
     criteria, status, created_at, updated_at";

pub struct AchievementRepository {
    pool: PgPool,
}

impl AchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AchievementRepositoryTrait for AchievementRepository {
    async fn get_achievement(&self, id: i64) -> Result<Option<Achievement>> {
        let achievement = sqlx::query_as::<_, Achievement>(&format!(
            "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    async fn list_active(&self) -> Result<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(&format!(
            "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE status = 'active' ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn list_active_by_trigger(
        &self,
        trigger: AchievementTrigger,
    ) -> Result<Vec<Achievement>> {
        // criteria 为 JSON 列，触发维度存于 criteria->>'trigger'
        let achievements = sqlx::query_as::<_, Achievement>(&format!(
            r#"
            SELECT {ACHIEVEMENT_COLUMNS}
            FROM achievements
            WHERE status = 'active' AND criteria->>'trigger' = $1
            ORDER BY id
            "#
        ))
        .bind(trigger.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn list_unlocked(&self, user_id: i64) -> Result<Vec<UserAchievement>> {
        let unlocked = sqlx::query_as::<_, UserAchievement>(
            r#"
            SELECT id, user_id, achievement_id, unlocked_at
            FROM user_achievements
            WHERE user_id = $1
            ORDER BY unlocked_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(unlocked)
    }

    async fn unlock(&self, user_id: i64, achievement_id: i64) -> Result<bool> {
        // 唯一约束保证只解锁一次，冲突时静默跳过
        let result = sqlx::query(
            r#"
            INSERT INTO user_achievements (user_id, achievement_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
