//! 成就评估服务
//!
//! 在积分变动、兑换完成、邀请完成后评估对应维度的成就，
//! 达标且未解锁的成就解锁一次并发放奖励积分。
//!
//! 与积分服务存在循环依赖（解锁要发积分，发积分要触发评估），
//! 通过 `PointsGranter` trait + 延迟注入解决。

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use loyalty_shared::observability::metrics;

use crate::error::Result;
use crate::models::{AchievementTrigger, SourceType};
use crate::repository::{AchievementRepository, AchievementRepositoryTrait};

/// 积分发放接口
///
/// 成就解锁奖励通过此接口回调积分服务，避免直接依赖具体类型
#[async_trait]
pub trait PointsGranter: Send + Sync {
    /// 发放奖励积分，ref_id 保证幂等
    async fn grant_bonus(
        &self,
        user_id: i64,
        amount: i64,
        source_type: SourceType,
        ref_id: String,
        remark: String,
    ) -> Result<()>;
}

/// 成就评估器
///
/// 线性扫描指定触发维度的已上线成就，逐个比对当前指标与阈值。
/// 解锁由数据库唯一约束保证只发生一次，奖励发放带幂等键。
pub struct AchievementEvaluator {
    achievement_repo: Arc<AchievementRepository>,
    pool: PgPool,
    /// 积分发放器（延迟注入，避免循环依赖）
    granter: RwLock<Option<Arc<dyn PointsGranter>>>,
}

impl AchievementEvaluator {
    pub fn new(achievement_repo: Arc<AchievementRepository>, pool: PgPool) -> Self {
        Self {
            achievement_repo,
            pool,
            granter: RwLock::new(None),
        }
    }

    /// 设置积分发放器
    ///
    /// 服务初始化完成后调用，注入积分服务的回调实现
    pub async fn set_granter(&self, granter: Arc<dyn PointsGranter>) {
        let mut guard = self.granter.write().await;
        *guard = Some(granter);
        info!("AchievementEvaluator 积分发放器已设置");
    }

    /// 评估指定维度的成就
    ///
    /// 解锁所有"阈值已达标且未解锁"的成就；单个成就处理失败
    /// 不影响其余成就的评估。
    #[instrument(skip(self), fields(user_id = user_id, trigger = trigger.as_str()))]
    pub async fn evaluate(&self, user_id: i64, trigger: AchievementTrigger) -> Result<()> {
        let achievements = self.achievement_repo.list_active_by_trigger(trigger).await?;
        if achievements.is_empty() {
            return Ok(());
        }

        let metric = self.current_metric(user_id, trigger).await?;

        for achievement in achievements {
            let criteria = match achievement.parse_criteria() {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        achievement_id = achievement.id,
                        code = %achievement.code,
                        error = %e,
                        "成就条件配置解析失败，跳过"
                    );
                    continue;
                }
            };

            if metric < criteria.threshold {
                continue;
            }

            // 唯一约束保证只解锁一次，重复评估静默跳过
            let newly_unlocked = self.achievement_repo.unlock(user_id, achievement.id).await?;
            if !newly_unlocked {
                continue;
            }

            metrics::record_achievement_unlock(&achievement.code);

            info!(
                user_id = user_id,
                achievement_id = achievement.id,
                code = %achievement.code,
                metric = metric,
                threshold = criteria.threshold,
                "成就已解锁"
            );

            if achievement.points_reward > 0 {
                self.grant_reward(user_id, &achievement.code, achievement.id, achievement.points_reward)
                    .await;
            }
        }

        Ok(())
    }

    // ==================== 私有方法 ====================

    /// 查询用户在指定维度的当前指标
    async fn current_metric(&self, user_id: i64, trigger: AchievementTrigger) -> Result<i64> {
        let metric = match trigger {
            AchievementTrigger::LifetimePoints => {
                sqlx::query_scalar::<_, i64>("SELECT lifetime_points FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .unwrap_or(0)
            }
            AchievementTrigger::OrderCount => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status = 'completed'",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
            }
            AchievementTrigger::ReferralCount => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM referrals WHERE referrer_id = $1 AND status = 'completed'",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(metric)
    }

    /// 发放成就奖励积分（失败不影响其余成就的解锁）
    async fn grant_reward(&self, user_id: i64, code: &str, achievement_id: i64, reward: i64) {
        let granter = {
            let guard = self.granter.read().await;
            guard.clone()
        };

        let Some(granter) = granter else {
            warn!(
                user_id = user_id,
                achievement_id = achievement_id,
                "积分发放器未注入，成就奖励未发放"
            );
            return;
        };

        let ref_id = format!("achievement:{}:user:{}", achievement_id, user_id);
        let remark = format!("成就奖励: {}", code);

        if let Err(e) = granter
            .grant_bonus(user_id, reward, SourceType::Achievement, ref_id, remark)
            .await
        {
            warn!(
                user_id = user_id,
                achievement_id = achievement_id,
                error = %e,
                "成就奖励发放失败"
            );
        }
    }
}
